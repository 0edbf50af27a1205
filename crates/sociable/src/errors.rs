//! Ошибки классификации collaborators

use injector::InjectorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("No SUT was specified, exactly one SUT must be specified per test case")]
    NoSystemUnderTest,

    #[error("Multiple SUT were specified, exactly one SUT must be specified per test case: {}", .names.join(","))]
    MultipleSystemsUnderTest { names: Vec<String> },

    #[error("Collaborator name appears in configuration more than once: {name}")]
    DuplicateCollaborator { name: String },

    #[error("Call collaborators() before trying to construct instances with the sociable injector (requested {name})")]
    SetupNotCalled { name: String },

    #[error("No test double registered for {name}")]
    NoTestDouble { name: String },

    #[error("Customizer for {name} failed: {source}")]
    Customizer {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum SociableError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Injector(#[from] InjectorError),
}

impl SociableError {
    /// Ошибка классификации, в том числе пришедшая через resolution hook
    pub fn classification(&self) -> Option<&ClassificationError> {
        match self {
            SociableError::Classification(err) => Some(err),
            SociableError::Injector(InjectorError::Intercepted { source, .. }) => source.downcast_ref(),
            SociableError::Injector(_) => None,
        }
    }
}

impl ClassificationError {
    /// Упаковать для передачи через resolution hook
    pub(crate) fn intercepted(self, name: &str) -> InjectorError {
        InjectorError::Intercepted {
            name: name.to_string(),
            source: self.into(),
        }
    }
}
