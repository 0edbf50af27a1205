use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use injector::Instance;

/// Настройка test double перед тем, как он попадёт в контейнер.
/// Получает конкретный тип mock'а или spy.
pub type Customizer = Arc<dyn Fn(&mut dyn Any) -> anyhow::Result<()> + Send + Sync>;

/// Типизированный customizer: `customizer(|mock: &mut MockClock| { ... })`
pub fn customizer<M, F>(f: F) -> Customizer
where
    M: Any,
    F: Fn(&mut M) + Send + Sync + 'static,
{
    Arc::new(move |double: &mut dyn Any| {
        let double = double.downcast_mut::<M>().ok_or_else(|| {
            anyhow::anyhow!("customizer expects a test double of type {}", type_name::<M>())
        })?;
        f(double);
        Ok(())
    })
}

/// Дескриптор collaborator'а в тестовом сценарии
#[derive(Clone)]
pub enum Collaborator {
    /// Просто имя: классифицируется автоматически
    Uncategorized(String),
    /// Всегда настоящий экземпляр, даже для boundary injectables
    Real(String),
    SystemUnderTest {
        name: String,
        assisted: Vec<Instance>,
    },
    Mock {
        name: String,
        customizer: Option<Customizer>,
    },
    /// Настоящий экземпляр, обёрнутый в spy
    PartialMock {
        name: String,
        assisted: Vec<Instance>,
        customizer: Option<Customizer>,
    },
}

impl Collaborator {
    pub fn sut(name: impl Into<String>) -> Self {
        Self::sut_with(name, Vec::new())
    }

    pub fn sut_with(name: impl Into<String>, assisted: Vec<Instance>) -> Self {
        Collaborator::SystemUnderTest {
            name: name.into(),
            assisted,
        }
    }

    pub fn real(name: impl Into<String>) -> Self {
        Collaborator::Real(name.into())
    }

    pub fn mock(name: impl Into<String>) -> Self {
        Collaborator::Mock {
            name: name.into(),
            customizer: None,
        }
    }

    pub fn mock_with(name: impl Into<String>, customizer: Customizer) -> Self {
        Collaborator::Mock {
            name: name.into(),
            customizer: Some(customizer),
        }
    }

    pub fn partial_mock(name: impl Into<String>) -> Self {
        Collaborator::PartialMock {
            name: name.into(),
            assisted: Vec::new(),
            customizer: None,
        }
    }

    pub fn partial_mock_with(
        name: impl Into<String>,
        assisted: Vec<Instance>,
        customizer: Option<Customizer>,
    ) -> Self {
        Collaborator::PartialMock {
            name: name.into(),
            assisted,
            customizer,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Collaborator::Uncategorized(name)
            | Collaborator::Real(name)
            | Collaborator::SystemUnderTest { name, .. }
            | Collaborator::Mock { name, .. }
            | Collaborator::PartialMock { name, .. } => name.as_str(),
        }
    }

    /// Assisted аргументы, с которыми collaborator разрешается в тесте
    pub fn assisted(&self) -> &[Instance] {
        match self {
            Collaborator::SystemUnderTest { assisted, .. }
            | Collaborator::PartialMock { assisted, .. } => assisted.as_slice(),
            _ => &[],
        }
    }
}

impl From<&str> for Collaborator {
    fn from(name: &str) -> Self {
        Collaborator::Uncategorized(name.to_string())
    }
}

impl From<String> for Collaborator {
    fn from(name: String) -> Self {
        Collaborator::Uncategorized(name)
    }
}

impl fmt::Debug for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Collaborator::Uncategorized(_) => "Uncategorized",
            Collaborator::Real(_) => "Real",
            Collaborator::SystemUnderTest { .. } => "SystemUnderTest",
            Collaborator::Mock { .. } => "Mock",
            Collaborator::PartialMock { .. } => "PartialMock",
        };
        f.debug_struct(kind)
            .field("name", &self.name())
            .field("assisted", &self.assisted().len())
            .finish()
    }
}
