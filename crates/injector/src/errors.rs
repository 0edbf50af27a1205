//! Ошибки DI контейнера
//!
//! Все ошибки фатальны для текущей операции (регистрация или resolve),
//! внутри контейнера ничего не повторяется.

use thiserror::Error;

use crate::scope::{InjectableType, Scope};

/// Основной error type для всех операций контейнера
#[derive(Debug, Error)]
pub enum InjectorError {
    /// Дубликат имени, несоответствие arity, некорректные метаданные
    #[error("Registration failed for '{name}': {reason}")]
    Registration { name: String, reason: String },

    #[error("Did not find any injectable for: {name}; {}", describe_known_groups(.module_groups, .container))]
    NotFound {
        name: String,
        module_groups: Vec<String>,
        container: String,
    },

    #[error("Module group not found: {name}")]
    ModuleGroupNotFound { name: String },

    #[error("Circular dependency in dependency graph for '{root}', name history stack: {}", .stack.join(" -> "))]
    CircularDependency { root: String, stack: Vec<String> },

    #[error("Cannot inject {dependency} ({dependency_scope}) into {consumer} ({consumer_scope}), {dependency} is shorter-lived than its consumer")]
    ScopeViolation {
        consumer: String,
        consumer_scope: Scope,
        dependency: String,
        dependency_scope: Scope,
    },

    #[error("Invalid number of user-supplied parameters for assisted injection for {name}, expected {expected}, got {actual}")]
    AssistedArgumentMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Assisted injection parameters were passed to {name} ({kind}, {scope}) but are not allowed for this injectable")]
    AssistedArgumentsNotAllowed {
        name: String,
        kind: InjectableType,
        scope: Scope,
    },

    #[error("Not implemented for {name}: {what}")]
    NotImplemented { name: String, what: String },

    #[error("During dependency search, a required injectable named {name} was not found in any module group")]
    UnbackedVertex { name: String },

    #[error("Type mismatch: expected {expected}, instance holds {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Missing argument #{index} while invoking {name}")]
    MissingArgument { name: String, index: usize },

    #[error("Failed to construct {name}: {source}")]
    Construction {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Ошибка resolution hook (например, sociable тестовое окружение)
    #[error("Resolution of {name} was rejected: {source}")]
    Intercepted {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Container was dropped before {name} could be instantiated")]
    ContainerDropped { name: String },

    /// Группа уже зарегистрирована, упало только eager создание
    #[error("Module group {group} was registered, but eager instantiation of {name} failed: {source}")]
    EagerInstantiation {
        group: String,
        name: String,
        #[source]
        source: Box<InjectorError>,
    },
}

impl InjectorError {
    pub fn registration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        InjectorError::Registration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn not_implemented(name: impl Into<String>, what: impl Into<String>) -> Self {
        InjectorError::NotImplemented {
            name: name.into(),
            what: what.into(),
        }
    }

    /// Имя injectable, с которым связана ошибка (если есть)
    pub fn injectable_name(&self) -> Option<&str> {
        match self {
            InjectorError::Registration { name, .. }
            | InjectorError::NotFound { name, .. }
            | InjectorError::AssistedArgumentMismatch { name, .. }
            | InjectorError::AssistedArgumentsNotAllowed { name, .. }
            | InjectorError::NotImplemented { name, .. }
            | InjectorError::UnbackedVertex { name }
            | InjectorError::MissingArgument { name, .. }
            | InjectorError::Construction { name, .. }
            | InjectorError::Intercepted { name, .. }
            | InjectorError::ContainerDropped { name }
            | InjectorError::EagerInstantiation { name, .. } => Some(name),
            InjectorError::ScopeViolation { dependency, .. } => Some(dependency),
            InjectorError::CircularDependency { root, .. } => Some(root),
            InjectorError::ModuleGroupNotFound { .. } | InjectorError::TypeMismatch { .. } => None,
        }
    }
}

fn describe_known_groups(module_groups: &[String], container: &str) -> String {
    if module_groups.is_empty() {
        format!(
            "no module groups were found. Are you calling a different Injector instance than the one you expected? Current injector: {container}"
        )
    } else {
        format!(
            "module groups currently registered: {}",
            module_groups.join(",")
        )
    }
}

pub type InjectorResult<T> = Result<T, InjectorError>;
