//! Test doubles: создание mock'ов и spy для классифицированных collaborators.
//!
//! Сам контейнер не умеет подменять методы объектов. Он вызывает
//! [`TestDoubles`], а [`DoubleRegistry`] - реализация, в которой тест
//! заранее регистрирует фабрики double'ов по имени injectable.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use injector::{InjectableRecord, Instance};
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::ClassificationError;

/// Customizer в виде, в котором его получает фабрика double'а
pub type Customize<'a> = &'a dyn Fn(&mut dyn Any) -> anyhow::Result<()>;

pub trait TestDoubles: Send + Sync {
    /// Создать mock для injectable и применить к нему customizer
    fn mock(&self, record: &InjectableRecord, customize: Customize<'_>) -> anyhow::Result<Instance>;

    /// Обернуть настоящий экземпляр в spy и применить к нему customizer
    fn spy(&self, record: &InjectableRecord, real: Instance, customize: Customize<'_>) -> anyhow::Result<Instance>;
}

type MockFactory = Box<dyn for<'a> Fn(Customize<'a>) -> anyhow::Result<Instance> + Send + Sync>;
type SpyFactory = Box<dyn for<'a> Fn(Instance, Customize<'a>) -> anyhow::Result<Instance> + Send + Sync>;

/// Фабрики double'ов по имени injectable
#[derive(Default)]
pub struct DoubleRegistry {
    mocks: HashMap<String, MockFactory>,
    spies: HashMap<String, SpyFactory>,
}

impl DoubleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `make` создаёт конкретный mock, `seal` превращает его в экземпляр,
    /// который ожидают потребители (обычно `Arc<dyn Trait>`).
    pub fn with_mock<M, F, S>(mut self, name: impl Into<String>, make: F, seal: S) -> Self
    where
        M: Any,
        F: Fn() -> M + Send + Sync + 'static,
        S: Fn(M) -> Instance + Send + Sync + 'static,
    {
        let factory: MockFactory = Box::new(move |customize| {
            let mut double = make();
            customize(&mut double as &mut dyn Any)?;
            Ok(seal(double))
        });
        self.mocks.insert(name.into(), factory);
        self
    }

    pub fn with_spy<W, F, S>(mut self, name: impl Into<String>, wrap: F, seal: S) -> Self
    where
        W: Any,
        F: Fn(Instance) -> anyhow::Result<W> + Send + Sync + 'static,
        S: Fn(W) -> Instance + Send + Sync + 'static,
    {
        let factory: SpyFactory = Box::new(move |real, customize| {
            let mut double = wrap(real)?;
            customize(&mut double as &mut dyn Any)?;
            Ok(seal(double))
        });
        self.spies.insert(name.into(), factory);
        self
    }

    pub fn has_mock(&self, name: &str) -> bool {
        self.mocks.contains_key(name)
    }

    pub fn has_spy(&self, name: &str) -> bool {
        self.spies.contains_key(name)
    }
}

impl TestDoubles for DoubleRegistry {
    fn mock(&self, record: &InjectableRecord, customize: Customize<'_>) -> anyhow::Result<Instance> {
        let factory = self.mocks.get(record.name()).ok_or_else(|| ClassificationError::NoTestDouble {
            name: record.name().to_string(),
        })?;
        debug!("🎭 Mock для {}", record.name());
        factory(customize)
    }

    fn spy(&self, record: &InjectableRecord, real: Instance, customize: Customize<'_>) -> anyhow::Result<Instance> {
        let factory = self.spies.get(record.name()).ok_or_else(|| ClassificationError::NoTestDouble {
            name: record.name().to_string(),
        })?;
        debug!("🕵️ Spy для {}", record.name());
        factory(real, customize)
    }
}

impl fmt::Debug for DoubleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoubleRegistry")
            .field("mocks", &self.mocks.keys().collect::<Vec<_>>())
            .field("spies", &self.spies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Журнал вызовов и подмены результатов. Клоны разделяют состояние.
#[derive(Clone, Default)]
pub struct SpyLog {
    calls: Arc<Mutex<Vec<String>>>,
    stubs: Arc<Mutex<HashMap<String, Box<dyn Any + Send + Sync>>>>,
}

impl SpyLog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == operation).count()
    }

    /// Вместо вызова настоящей реализации вернуть `value`
    pub fn stub<R>(&self, operation: &str, value: R)
    where
        R: Clone + Send + Sync + 'static,
    {
        self.stubs.lock().insert(operation.to_string(), Box::new(value));
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
        self.stubs.lock().clear();
    }

    fn record<R>(&self, operation: &str) -> Option<R>
    where
        R: Clone + 'static,
    {
        self.calls.lock().push(operation.to_string());
        self.stubs
            .lock()
            .get(operation)
            .and_then(|stub| stub.downcast_ref::<R>())
            .cloned()
    }
}

impl fmt::Debug for SpyLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpyLog")
            .field("calls", &self.calls.lock().len())
            .field("stubs", &self.stubs.lock().len())
            .finish()
    }
}

/// Spy вокруг настоящей реализации: записывает вызовы, позволяет
/// подменить результат отдельных операций.
///
/// Реализация trait'а для spy делегирует через [`Spy::call`]:
///
/// ```
/// use std::sync::Arc;
/// use sociable::Spy;
///
/// trait Storage: Send + Sync {
///     fn load(&self, key: &str) -> String;
/// }
///
/// impl Storage for Spy<dyn Storage> {
///     fn load(&self, key: &str) -> String {
///         self.call("load", |real| real.load(key))
///     }
/// }
///
/// struct Memory;
/// impl Storage for Memory {
///     fn load(&self, key: &str) -> String {
///         format!("value of {key}")
///     }
/// }
///
/// let spy = Spy::new(Arc::new(Memory) as Arc<dyn Storage>);
/// spy.log().stub("load", "stubbed".to_string());
/// assert_eq!(spy.load("a"), "stubbed");
/// assert_eq!(spy.log().call_count("load"), 1);
/// ```
pub struct Spy<T: ?Sized> {
    real: Arc<T>,
    log: SpyLog,
}

impl<T: ?Sized> Spy<T> {
    pub fn new(real: Arc<T>) -> Self {
        Self {
            real,
            log: SpyLog::default(),
        }
    }

    pub fn real(&self) -> &Arc<T> {
        &self.real
    }

    pub fn log(&self) -> SpyLog {
        self.log.clone()
    }

    pub fn call<R, F>(&self, operation: &str, forward: F) -> R
    where
        R: Clone + 'static,
        F: FnOnce(&T) -> R,
    {
        match self.log.record::<R>(operation) {
            Some(stubbed) => stubbed,
            None => forward(&self.real),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Spy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("type", &type_name::<T>())
            .field("log", &self.log)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use injector::Subject;

    trait Counter: Send + Sync {
        fn next(&self) -> u32;
    }

    struct Fixed(u32);

    impl Counter for Fixed {
        fn next(&self) -> u32 {
            self.0
        }
    }

    impl Counter for Spy<dyn Counter> {
        fn next(&self) -> u32 {
            self.call("next", |real| real.next())
        }
    }

    fn record(name: &str) -> InjectableRecord {
        InjectableRecord::new(name, Subject::value(0u8)).unwrap()
    }

    fn no_customizer(_: &mut dyn Any) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_mock_factory_applies_customizer_before_sealing() {
        let registry = DoubleRegistry::new().with_mock(
            "counter",
            || Fixed(0),
            |fixed| Instance::from_arc(Arc::new(fixed) as Arc<dyn Counter>),
        );

        let set_to_seven = |double: &mut dyn Any| -> anyhow::Result<()> {
            double
                .downcast_mut::<Fixed>()
                .ok_or_else(|| anyhow::anyhow!("not a Fixed"))?
                .0 = 7;
            Ok(())
        };

        let instance = registry.mock(&record("counter"), &set_to_seven).unwrap();
        assert_eq!(instance.downcast::<dyn Counter>().unwrap().next(), 7);
    }

    #[test]
    fn test_missing_double_is_reported() {
        let registry = DoubleRegistry::new();
        let err = registry.mock(&record("ghost"), &no_customizer).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassificationError>(),
            Some(ClassificationError::NoTestDouble { name }) if name == "ghost"
        ));
    }

    #[test]
    fn test_spy_forwards_records_and_stubs() {
        let registry = DoubleRegistry::new().with_spy(
            "counter",
            |real: Instance| Ok(Spy::new(real.downcast::<dyn Counter>()?)),
            |spy: Spy<dyn Counter>| Instance::from_arc(Arc::new(spy) as Arc<dyn Counter>),
        );

        let real = Instance::from_arc(Arc::new(Fixed(3)) as Arc<dyn Counter>);
        let spied = registry
            .spy(&record("counter"), real, &no_customizer)
            .unwrap()
            .downcast::<dyn Counter>()
            .unwrap();

        assert_eq!(spied.next(), 3);
        assert_eq!(spied.next(), 3);
    }

    #[test]
    fn test_spy_log_shared_between_clones() {
        let spy = Spy::new(Arc::new(Fixed(1)) as Arc<dyn Counter>);
        let log = spy.log();

        assert_eq!(spy.next(), 1);
        log.stub("next", 99u32);
        assert_eq!(spy.next(), 99);
        assert_eq!(log.call_count("next"), 2);

        log.reset();
        assert!(spy.log().calls().is_empty());
        assert_eq!(spy.next(), 1);
    }
}
