//! Метаданные injectable: scope, параметры, assisted аргументы, флаги.

use crate::errors::InjectorError;
use crate::scope::Scope;

/// Дескриптор параметра конструктора
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Param {
    /// Экземпляр injectable с указанным именем
    Named(String),
    /// `Instancer`, создающий injectable с указанным именем по требованию
    Instancer(String),
}

impl Param {
    pub fn named(name: impl Into<String>) -> Self {
        Param::Named(name.into())
    }

    pub fn instancer(name: impl Into<String>) -> Self {
        Param::Instancer(name.into())
    }

    /// Имя injectable, на который ссылается параметр
    pub fn target(&self) -> &str {
        match self {
            Param::Named(name) | Param::Instancer(name) => name,
        }
    }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Param::Named(name.to_string())
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Param::Named(name)
    }
}

/// Builder метаданных для конструируемых injectables.
///
/// ```
/// use injector::{InjectableMeta, Param};
///
/// let meta = InjectableMeta::default()
///     .singleton()
///     .param("clock")
///     .param(Param::instancer("request"))
///     .eager();
/// assert_eq!(meta.params().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectableMeta {
    scope: Option<Scope>,
    params: Vec<Param>,
    assisted: usize,
    eager: bool,
    boundary: bool,
}

impl InjectableMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn singleton(self) -> Self {
        self.scope(Scope::Singleton)
    }

    pub fn application(self) -> Self {
        self.scope(Scope::Application)
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    pub fn param(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn with_params<I, P>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn instancer(self, name: impl Into<String>) -> Self {
        self.param(Param::Instancer(name.into()))
    }

    pub fn assisted(mut self, count: usize) -> Self {
        self.assisted = count;
        self
    }

    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Пометить как границу инфраструктуры (I/O, окружение)
    pub fn boundary(mut self) -> Self {
        self.boundary = true;
        self
    }

    pub fn declared_scope(&self) -> Option<Scope> {
        self.scope
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn assisted_count(&self) -> usize {
        self.assisted
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }

    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    /// Проверить метаданные против фактической arity конструктора.
    /// Scope по умолчанию - Prototype.
    pub fn validate(&self, name: &str, arity: usize) -> Result<Scope, InjectorError> {
        let scope = self.scope.unwrap_or(Scope::Prototype);

        if self.eager && !scope.is_cached() {
            return Err(InjectorError::registration(
                name,
                format!("eager instantiation is only permitted for SINGLETON and APPLICATION scopes, got {scope}"),
            ));
        }

        if self.assisted > 0 && scope != Scope::Prototype {
            return Err(InjectorError::registration(
                name,
                format!("assisted injection parameters are only allowed with PROTOTYPE scope, got {scope}"),
            ));
        }

        if let Some(index) = self.params.iter().position(|p| p.target().trim().is_empty()) {
            return Err(InjectorError::registration(
                name,
                format!("parameter #{index} has an empty injectable name"),
            ));
        }

        let declared = self.params.len() + self.assisted;
        if declared != arity {
            return Err(InjectorError::registration(
                name,
                format!(
                    "constructor takes {arity} arguments but metadata declares {} parameters and {} assisted arguments",
                    self.params.len(),
                    self.assisted
                ),
            ));
        }

        Ok(scope)
    }
}
