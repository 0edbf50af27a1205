//! Контейнер для sociable тестов.
//!
//! [`SociableInjector`] ставит resolution hook на обычный [`Injector`]:
//! классифицированные collaborators подменяются mock'ами и spy, а созданные
//! для теста экземпляры кэшируются до конца теста. Экземпляр с assisted
//! аргументами попадает в кэш только при разрешении с аргументами своего
//! дескриптора.

use std::any::Any;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use injector::{InjectableRecord, Injector, InjectorError, Instance, ResolutionContext, ResolutionHook, Scope};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::classification::{Classification, TestCollaborators};
use crate::collaborator::{Collaborator, Customizer};
use crate::doubles::TestDoubles;
use crate::errors::{ClassificationError, SociableError};

#[derive(Default)]
struct TestState {
    collaborators: Option<TestCollaborators>,
    cache: HashMap<String, Instance>,
}

impl TestState {
    fn reset(&mut self) {
        self.collaborators = None;
        self.cache.clear();
    }
}

struct SociableState {
    doubles: Arc<dyn TestDoubles>,
    test: Mutex<TestState>,
}

struct SociableHook {
    state: Arc<SociableState>,
}

impl SociableHook {
    fn customize(name: &str, customizer: Option<&Customizer>, double: &mut dyn Any) -> anyhow::Result<()> {
        match customizer {
            Some(customize) => customize(double).map_err(|source| {
                ClassificationError::Customizer {
                    name: name.to_string(),
                    source,
                }
                .into()
            }),
            None => Ok(()),
        }
    }

    fn intercepted(record: &InjectableRecord, source: anyhow::Error) -> InjectorError {
        InjectorError::Intercepted {
            name: record.name().to_string(),
            source,
        }
    }
}

impl ResolutionHook for SociableHook {
    fn instance_for(
        &self,
        injector: &Injector,
        record: &Arc<InjectableRecord>,
        ctx: &mut ResolutionContext,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError> {
        let name = record.name();

        // блокировка не держится во время создания: конструкторы снова
        // заходят в hook за своими зависимостями
        let (classification, customizer, cacheable) = {
            let test = self.state.test.lock();
            let collaborators = test
                .collaborators
                .as_ref()
                .ok_or_else(|| ClassificationError::SetupNotCalled { name: name.to_string() }.intercepted(name))?;
            let classification = collaborators.classification_of(name);

            let cacheable = match classification {
                None => false,
                Some(Classification::Mocked) => true,
                Some(_) => {
                    record.check_assisted(assisted.len())?;
                    // экземпляр с assisted аргументами общий только для
                    // разрешения самого дескриптора
                    record.assisted_count() == 0
                        || collaborators
                            .requested_assisted(name)
                            .is_some_and(|requested| same_instances(requested, &assisted))
                }
            };

            if cacheable {
                if let Some(cached) = test.cache.get(name) {
                    return Ok(cached.clone());
                }
            }
            (classification, collaborators.customizer_for(name), cacheable)
        };

        let instance = match classification {
            None => return injector.construct_in_scope(record, ctx, assisted),
            Some(Classification::Mocked) => {
                if !assisted.is_empty() {
                    debug!("🎭 {}: assisted аргументы mock'у не передаются", name);
                }
                let customize = |double: &mut dyn Any| Self::customize(name, customizer.as_ref(), double);
                self.state
                    .doubles
                    .mock(record, &customize)
                    .map_err(|e| Self::intercepted(record, e))?
            }
            Some(Classification::PartialMocked) => {
                let real = injector.construct_in_scope(record, ctx, assisted)?;
                let customize = |double: &mut dyn Any| Self::customize(name, customizer.as_ref(), double);
                self.state
                    .doubles
                    .spy(record, real, &customize)
                    .map_err(|e| Self::intercepted(record, e))?
            }
            Some(Classification::Real | Classification::SystemUnderTest) => {
                injector.construct_in_scope(record, ctx, assisted)?
            }
        };

        if !cacheable {
            debug!("🔄 {}: assisted аргументы отличаются от дескриптора, без кэша", name);
            return Ok(instance);
        }
        let mut test = self.state.test.lock();
        Ok(test.cache.entry(name.to_string()).or_insert(instance).clone())
    }
}

fn same_instances(left: &[Instance], right: &[Instance]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| l.ptr_eq(r))
}

/// Обёртка над [`Injector`] для sociable тестов
pub struct SociableInjector {
    injector: Injector,
    state: Arc<SociableState>,
}

impl SociableInjector {
    pub fn new(injector: Injector, doubles: impl TestDoubles + 'static) -> Self {
        let state = Arc::new(SociableState {
            doubles: Arc::new(doubles),
            test: Mutex::new(TestState::default()),
        });

        if injector
            .set_resolution_hook(Arc::new(SociableHook { state: state.clone() }))
            .is_some()
        {
            debug!("🔁 Предыдущий resolution hook заменён");
        }
        info!("🧪 Sociable injector для {}", injector.name());

        Self { injector, state }
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Начать тест; состояние сбрасывается при drop guard'а
    pub fn begin_test(&self) -> TestCase<'_> {
        self.before_each();
        TestCase { sociable: self }
    }

    pub fn before_each(&self) {
        self.state.test.lock().reset();
    }

    /// Сбросить классификацию, кэш теста и singleton'ы
    pub fn after_each(&self) {
        self.state.test.lock().reset();
        self.injector.clear_scope(Scope::Singleton);
        debug!("🧹 Состояние теста очищено");
    }

    /// Классифицировать collaborators и вернуть их экземпляры в порядке
    /// дескрипторов.
    pub fn collaborators(&self, descriptors: Vec<Collaborator>) -> Result<Vec<Instance>, SociableError> {
        let collaborators = TestCollaborators::create(&self.injector, descriptors)?;
        let requested = collaborators.requested().to_vec();

        {
            let mut test = self.state.test.lock();
            test.cache.clear();
            test.collaborators = Some(collaborators);
        }

        requested
            .into_iter()
            .map(|(name, assisted)| Ok(self.injector.get_instance_with(&name, assisted)?))
            .collect()
    }

    /// Классификация текущего теста, если она уже выполнена
    pub fn classification_of(&self, name: &str) -> Option<Classification> {
        self.state
            .test
            .lock()
            .collaborators
            .as_ref()
            .and_then(|c| c.classification_of(name))
    }
}

impl Drop for SociableInjector {
    fn drop(&mut self) {
        self.injector.clear_resolution_hook();
    }
}

impl std::fmt::Debug for SociableInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let test = self.state.test.lock();
        f.debug_struct("SociableInjector")
            .field("injector", &self.injector)
            .field("collaborators", &test.collaborators)
            .field("cached", &test.cache.len())
            .finish()
    }
}

/// Guard одного теста: при drop вызывает [`SociableInjector::after_each`]
pub struct TestCase<'a> {
    sociable: &'a SociableInjector,
}

impl Deref for TestCase<'_> {
    type Target = SociableInjector;

    fn deref(&self) -> &SociableInjector {
        self.sociable
    }
}

impl Drop for TestCase<'_> {
    fn drop(&mut self) {
        self.sociable.after_each();
    }
}
