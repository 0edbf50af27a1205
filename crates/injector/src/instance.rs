//! Type-erased экземпляры, которые контейнер передаёт между injectables.
//!
//! `Instance` всегда хранит `Arc<T>` (в том числе `Arc<dyn Trait>`), поэтому
//! singleton'ы раздаются как разделяемые ссылки, а параметры конструкторов
//! извлекаются обратно в типизированный `Arc<T>`.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::errors::InjectorError;

#[derive(Clone)]
pub struct Instance {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Обернуть значение. Извлекается как `Arc<T>`.
    pub fn new<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(value))
    }

    /// Обернуть уже разделяемое значение, включая trait objects.
    pub fn from_arc<T>(value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn downcast<T>(&self) -> Result<Arc<T>, InjectorError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get::<T>().ok_or(InjectorError::TypeMismatch {
            expected: type_name::<T>(),
            actual: self.type_name,
        })
    }

    pub fn is<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.is::<Arc<T>>()
    }

    /// Тот же самый экземпляр (а не равный по значению)
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_name)
            .finish()
    }
}

/// Извлечение типизированного аргумента конструктора из `Instance`
pub trait FromInstance: Sized {
    fn from_instance(instance: &Instance) -> Result<Self, InjectorError>;
}

impl<T> FromInstance for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn from_instance(instance: &Instance) -> Result<Self, InjectorError> {
        instance.downcast::<T>()
    }
}

impl FromInstance for Instance {
    fn from_instance(instance: &Instance) -> Result<Self, InjectorError> {
        Ok(instance.clone())
    }
}

/// Результат конструктора или provider'а
pub trait IntoInstance {
    fn into_instance(self) -> anyhow::Result<Instance>;
}

impl<T> IntoInstance for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn into_instance(self) -> anyhow::Result<Instance> {
        Ok(Instance::from_arc(self))
    }
}

impl IntoInstance for Instance {
    fn into_instance(self) -> anyhow::Result<Instance> {
        Ok(self)
    }
}

impl<R> IntoInstance for anyhow::Result<R>
where
    R: IntoInstance,
{
    fn into_instance(self) -> anyhow::Result<Instance> {
        self?.into_instance()
    }
}

/// Собрать assisted аргументы: `assisted!["x", 42u16]`.
///
/// Каждое значение оборачивается через `Instance::new` и извлекается
/// получателем как `Arc<T>`.
#[macro_export]
macro_rules! assisted {
    () => {
        ::std::vec::Vec::<$crate::Instance>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::Instance::new($value)),+]
    };
}
