use crate::errors::InjectorError;
use crate::instance::Instance;
use crate::metadata::Param;
use crate::scope::{InjectableType, Scope};
use crate::subject::{Instantiate, Subject};

/// Зарегистрированный injectable.
///
/// Тип и scope выводятся из subject один раз при создании записи
/// и после этого не меняются.
#[derive(Debug)]
pub struct InjectableRecord {
    name: String,
    kind: InjectableType,
    scope: Scope,
    params: Vec<Param>,
    assisted: usize,
    eager: bool,
    boundary: bool,
    subject: Subject,
}

impl InjectableRecord {
    pub fn new(name: impl Into<String>, subject: Subject) -> Result<Self, InjectorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InjectorError::registration(
                name,
                "injectable name must be a non-empty string",
            ));
        }

        let (kind, scope, params, assisted, eager, boundary) = match &subject {
            Subject::Constructor(constructor) => {
                let meta = constructor.meta();
                let scope = meta.validate(&name, constructor.arity())?;
                (
                    InjectableType::Constructed,
                    scope,
                    meta.params().to_vec(),
                    meta.assisted_count(),
                    meta.is_eager(),
                    meta.is_boundary(),
                )
            }
            Subject::Value(value) => (
                InjectableType::FixedValue,
                Scope::Singleton,
                Vec::new(),
                0,
                false,
                value.is_boundary(),
            ),
            Subject::Provider(provider) => {
                let declared = provider.params().len() + provider.assisted_count();
                if declared != provider.arity() {
                    return Err(InjectorError::registration(
                        name,
                        format!(
                            "provider takes {} arguments but declares {} parameters and {} assisted arguments",
                            provider.arity(),
                            provider.params().len(),
                            provider.assisted_count()
                        ),
                    ));
                }
                if let Some(index) = provider.params().iter().position(|p| p.target().trim().is_empty()) {
                    return Err(InjectorError::registration(
                        name,
                        format!("parameter #{index} has an empty injectable name"),
                    ));
                }
                (
                    InjectableType::Provider,
                    Scope::Prototype,
                    provider.params().to_vec(),
                    provider.assisted_count(),
                    false,
                    provider.is_boundary(),
                )
            }
        };

        Ok(Self {
            name,
            kind,
            scope,
            params,
            assisted,
            eager,
            boundary,
            subject,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InjectableType {
        self.kind
    }

    pub fn scope(&self) -> Scope {
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

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Может ли запись принимать assisted аргументы при resolve
    pub fn accepts_assisted(&self) -> bool {
        self.scope == Scope::Prototype && self.kind != InjectableType::FixedValue
    }

    /// Проверить число assisted аргументов, переданных при resolve
    pub fn check_assisted(&self, actual: usize) -> Result<(), InjectorError> {
        if actual > 0 && !self.accepts_assisted() {
            return Err(InjectorError::AssistedArgumentsNotAllowed {
                name: self.name.clone(),
                kind: self.kind,
                scope: self.scope,
            });
        }
        if actual != self.assisted {
            return Err(InjectorError::AssistedArgumentMismatch {
                name: self.name.clone(),
                expected: self.assisted,
                actual,
            });
        }
        Ok(())
    }

    /// Готовое значение для FixedValue записей
    pub fn fixed_value(&self) -> Option<&Instance> {
        match &self.subject {
            Subject::Value(value) => Some(value.value()),
            _ => None,
        }
    }

    /// Контракт создания для Constructed и Provider записей
    pub fn instantiator(&self) -> Option<&dyn Instantiate> {
        match &self.subject {
            Subject::Constructor(constructor) => Some(constructor),
            Subject::Provider(provider) => Some(provider),
            Subject::Value(_) => None,
        }
    }

    pub(crate) fn provider_id(&self) -> Option<usize> {
        match &self.subject {
            Subject::Provider(provider) => Some(provider.id()),
            _ => None,
        }
    }
}
