//! Subjects: то, что стоит за injectable.
//!
//! Конструктор и provider реализуют единый контракт [`Instantiate`]:
//! получить разрешённые параметры и assisted аргументы, вызвать функцию.
//! Arity функции известна на этапе компиляции через [`Invocable`].

use std::fmt;
use std::sync::Arc;

use crate::errors::InjectorError;
use crate::instance::{FromInstance, Instance, IntoInstance};
use crate::metadata::{InjectableMeta, Param};

/// Типизированная функция, вызываемая со списком type-erased аргументов.
///
/// Реализована для `Fn(A1, .., An) -> R` с n от 0 до 8, где каждый `Ai`
/// реализует [`FromInstance`], а `R` реализует [`IntoInstance`].
pub trait Invocable<Args>: Send + Sync + 'static {
    const ARITY: usize;

    fn invoke(&self, name: &str, args: &[Instance]) -> Result<Instance, InjectorError>;
}

macro_rules! count_idents {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count_idents!($($tail)*) };
}

macro_rules! impl_invocable {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> Invocable<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: IntoInstance,
            $($arg: FromInstance,)*
        {
            const ARITY: usize = count_idents!($($arg)*);

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn invoke(&self, name: &str, args: &[Instance]) -> Result<Instance, InjectorError> {
                let mut iter = args.iter();
                let mut index = 0usize;
                $(
                    let $arg = match iter.next() {
                        Some(instance) => <$arg as FromInstance>::from_instance(instance)?,
                        None => {
                            return Err(InjectorError::MissingArgument {
                                name: name.to_string(),
                                index,
                            })
                        }
                    };
                    index += 1;
                )*

                (self)($($arg),*)
                    .into_instance()
                    .map_err(|source| InjectorError::Construction {
                        name: name.to_string(),
                        source,
                    })
            }
        }
    };
}

impl_invocable!();
impl_invocable!(A1);
impl_invocable!(A1, A2);
impl_invocable!(A1, A2, A3);
impl_invocable!(A1, A2, A3, A4);
impl_invocable!(A1, A2, A3, A4, A5);
impl_invocable!(A1, A2, A3, A4, A5, A6);
impl_invocable!(A1, A2, A3, A4, A5, A6, A7);
impl_invocable!(A1, A2, A3, A4, A5, A6, A7, A8);

type ErasedFn = Arc<dyn Fn(&str, &[Instance]) -> Result<Instance, InjectorError> + Send + Sync>;

fn erase<F, Args>(f: F) -> (ErasedFn, usize)
where
    F: Invocable<Args>,
    Args: 'static,
{
    let invoke: ErasedFn = Arc::new(move |name: &str, args: &[Instance]| f.invoke(name, args));
    (invoke, F::ARITY)
}

/// Единый контракт создания экземпляра
pub trait Instantiate: Send + Sync {
    /// Сколько аргументов принимает функция (параметры + assisted)
    fn arity(&self) -> usize;

    fn assisted_count(&self) -> usize;

    /// `params` - разрешённые параметры в порядке объявления,
    /// `assisted` - аргументы вызывающего, добавляются в конец.
    fn instantiate(
        &self,
        name: &str,
        params: Vec<Instance>,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError>;
}

fn check_assisted(name: &str, expected: usize, assisted: &[Instance]) -> Result<(), InjectorError> {
    if assisted.len() != expected {
        return Err(InjectorError::AssistedArgumentMismatch {
            name: name.to_string(),
            expected,
            actual: assisted.len(),
        });
    }
    Ok(())
}

fn call_with(
    invoke: &ErasedFn,
    name: &str,
    mut params: Vec<Instance>,
    assisted: Vec<Instance>,
) -> Result<Instance, InjectorError> {
    params.extend(assisted);
    invoke(name, &params)
}

/// Конструктор с метаданными
#[derive(Clone)]
pub struct Constructor {
    invoke: ErasedFn,
    arity: usize,
    meta: InjectableMeta,
}

impl Constructor {
    pub fn new<F, Args>(f: F) -> Self
    where
        F: Invocable<Args>,
        Args: 'static,
    {
        let (invoke, arity) = erase(f);
        Self {
            invoke,
            arity,
            meta: InjectableMeta::default(),
        }
    }

    /// Приложить метаданные (проверяются при регистрации)
    pub fn annotate(mut self, meta: InjectableMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn meta(&self) -> &InjectableMeta {
        &self.meta
    }
}

impl Instantiate for Constructor {
    fn arity(&self) -> usize {
        self.arity
    }

    fn assisted_count(&self) -> usize {
        self.meta.assisted_count()
    }

    fn instantiate(
        &self,
        name: &str,
        params: Vec<Instance>,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError> {
        check_assisted(name, self.meta.assisted_count(), &assisted)?;
        call_with(&self.invoke, name, params, assisted)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("arity", &self.arity)
            .field("meta", &self.meta)
            .finish()
    }
}

/// Provider-функция. Всегда Prototype: вызывается заново при каждом resolve.
///
/// Клоны разделяют идентичность: один provider нельзя зарегистрировать
/// под двумя именами.
#[derive(Clone)]
pub struct Provider {
    invoke: ErasedFn,
    arity: usize,
    params: Vec<Param>,
    assisted: usize,
    boundary: bool,
}

impl Provider {
    pub fn new<F, Args>(f: F) -> Self
    where
        F: Invocable<Args>,
        Args: 'static,
    {
        let (invoke, arity) = erase(f);
        Self {
            invoke,
            arity,
            params: Vec::new(),
            assisted: 0,
            boundary: false,
        }
    }

    pub fn param(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn assisted(mut self, count: usize) -> Self {
        self.assisted = count;
        self
    }

    pub fn boundary(mut self) -> Self {
        self.boundary = true;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    /// Идентичность provider-функции
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.invoke) as *const () as usize
    }
}

impl Instantiate for Provider {
    fn arity(&self) -> usize {
        self.arity
    }

    fn assisted_count(&self) -> usize {
        self.assisted
    }

    fn instantiate(
        &self,
        name: &str,
        params: Vec<Instance>,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError> {
        check_assisted(name, self.assisted, &assisted)?;
        call_with(&self.invoke, name, params, assisted)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id())
            .field("params", &self.params)
            .field("assisted", &self.assisted)
            .finish()
    }
}

/// Готовое значение, раздаётся как singleton
#[derive(Debug, Clone)]
pub struct FixedValue {
    value: Instance,
    boundary: bool,
}

impl FixedValue {
    pub fn new(value: Instance) -> Self {
        Self {
            value,
            boundary: false,
        }
    }

    pub fn boundary(mut self) -> Self {
        self.boundary = true;
        self
    }

    pub fn value(&self) -> &Instance {
        &self.value
    }

    pub fn is_boundary(&self) -> bool {
        self.boundary
    }
}

#[derive(Debug, Clone)]
pub enum Subject {
    Constructor(Constructor),
    Value(FixedValue),
    Provider(Provider),
}

impl Subject {
    pub fn value<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Subject::Value(FixedValue::new(Instance::new(value)))
    }

    pub fn shared<T>(value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Subject::Value(FixedValue::new(Instance::from_arc(value)))
    }
}

impl From<Constructor> for Subject {
    fn from(constructor: Constructor) -> Self {
        Subject::Constructor(constructor)
    }
}

impl From<Provider> for Subject {
    fn from(provider: Provider) -> Self {
        Subject::Provider(provider)
    }
}

impl From<FixedValue> for Subject {
    fn from(value: FixedValue) -> Self {
        Subject::Value(value)
    }
}

impl From<Instance> for Subject {
    fn from(value: Instance) -> Self {
        Subject::Value(FixedValue::new(value))
    }
}
