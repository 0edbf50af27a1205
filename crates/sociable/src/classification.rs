//! Классификация collaborators для sociable тестов.
//!
//! От SUT и partial mock'ов обходятся транзитивные зависимости. Boundary
//! injectables (I/O, окружение) становятся mock'ами, и их зависимости не
//! обходятся. Всё остальное создаётся по-настоящему.

use std::collections::{HashMap, HashSet};

use injector::{Injector, Instance};
use tracing::debug;

use crate::collaborator::{Collaborator, Customizer};
use crate::errors::{ClassificationError, SociableError};

/// Роль injectable в текущем тесте
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    SystemUnderTest,
    Real,
    Mocked,
    PartialMocked,
}

/// Результат классификации для одного теста
#[derive(Clone)]
pub struct TestCollaborators {
    sut: String,
    reals: Vec<String>,
    mocks: HashMap<String, Option<Customizer>>,
    partial_mocks: HashMap<String, Option<Customizer>>,
    /// Запрошенные collaborators в порядке дескрипторов
    requested: Vec<(String, Vec<Instance>)>,
}

struct Builder<'a> {
    injector: &'a Injector,
    boundary: HashSet<String>,
    forced_real: HashSet<String>,
    sut: String,
    reals: Vec<String>,
    real_set: HashSet<String>,
    mocks: HashMap<String, Option<Customizer>>,
    partial_mocks: HashMap<String, Option<Customizer>>,
}

impl Builder<'_> {
    fn is_classified(&self, name: &str) -> bool {
        name == self.sut
            || self.real_set.contains(name)
            || self.mocks.contains_key(name)
            || self.partial_mocks.contains_key(name)
    }

    fn add_real(&mut self, name: &str) -> Result<(), SociableError> {
        if self.real_set.insert(name.to_string()) {
            self.reals.push(name.to_string());
            self.expand(name)?;
        }
        Ok(())
    }

    fn add_uncategorized(&mut self, name: &str) -> Result<(), SociableError> {
        if self.is_classified(name) {
            return Ok(());
        }

        if self.boundary.contains(name) && !self.forced_real.contains(name) {
            debug!("🎭 {} - boundary, будет mock", name);
            self.mocks.insert(name.to_string(), None);
            Ok(())
        } else {
            self.add_real(name)
        }
    }

    fn expand(&mut self, name: &str) -> Result<(), SociableError> {
        for dependency in self.injector.descendants_of(name)? {
            self.add_uncategorized(&dependency)?;
        }
        Ok(())
    }
}

impl TestCollaborators {
    pub fn create(injector: &Injector, descriptors: Vec<Collaborator>) -> Result<Self, SociableError> {
        let mut names = HashSet::new();
        let mut suts = Vec::new();
        let mut forced_real = HashSet::new();
        let mut uncategorized = Vec::new();
        let mut mocks = HashMap::new();
        let mut partial_mocks = HashMap::new();
        let mut requested = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let name = descriptor.name().to_string();
            if !names.insert(name.clone()) {
                return Err(ClassificationError::DuplicateCollaborator { name }.into());
            }
            requested.push((name.clone(), descriptor.assisted().to_vec()));

            match descriptor {
                Collaborator::Uncategorized(_) => uncategorized.push(name),
                Collaborator::Real(_) => {
                    forced_real.insert(name.clone());
                    uncategorized.push(name);
                }
                Collaborator::SystemUnderTest { .. } => suts.push(name),
                Collaborator::Mock { customizer, .. } => {
                    mocks.insert(name, customizer);
                }
                Collaborator::PartialMock { customizer, .. } => {
                    partial_mocks.insert(name, customizer);
                }
            }
        }

        let sut = match suts.len() {
            0 => return Err(ClassificationError::NoSystemUnderTest.into()),
            1 => suts.remove(0),
            _ => return Err(ClassificationError::MultipleSystemsUnderTest { names: suts }.into()),
        };

        let roots: Vec<String> = std::iter::once(sut.clone())
            .chain(partial_mocks.keys().cloned())
            .collect();

        let mut builder = Builder {
            injector,
            boundary: injector
                .injectable_search(|record| record.is_boundary())
                .into_iter()
                .collect(),
            forced_real,
            sut,
            reals: Vec::new(),
            real_set: HashSet::new(),
            mocks,
            partial_mocks,
        };

        for root in &roots {
            builder.expand(root)?;
        }

        // запрошенные, но не достигнутые обходом - настоящие
        for name in &uncategorized {
            if !builder.is_classified(name) {
                builder.add_real(name)?;
            }
        }

        debug!(
            "🧪 SUT {}: {} real, {} mocks, {} partial mocks",
            builder.sut,
            builder.reals.len(),
            builder.mocks.len(),
            builder.partial_mocks.len()
        );

        Ok(Self {
            sut: builder.sut,
            reals: builder.reals,
            mocks: builder.mocks,
            partial_mocks: builder.partial_mocks,
            requested,
        })
    }

    pub fn sut(&self) -> &str {
        &self.sut
    }

    pub fn reals(&self) -> &[String] {
        &self.reals
    }

    pub fn mocks(&self) -> impl Iterator<Item = &str> {
        self.mocks.keys().map(String::as_str)
    }

    pub fn partial_mocks(&self) -> impl Iterator<Item = &str> {
        self.partial_mocks.keys().map(String::as_str)
    }

    pub fn classification_of(&self, name: &str) -> Option<Classification> {
        if name == self.sut {
            Some(Classification::SystemUnderTest)
        } else if self.mocks.contains_key(name) {
            Some(Classification::Mocked)
        } else if self.partial_mocks.contains_key(name) {
            Some(Classification::PartialMocked)
        } else if self.reals.iter().any(|r| r == name) {
            Some(Classification::Real)
        } else {
            None
        }
    }

    pub fn customizer_for(&self, name: &str) -> Option<Customizer> {
        self.mocks
            .get(name)
            .or_else(|| self.partial_mocks.get(name))
            .cloned()
            .flatten()
    }

    /// Имена и assisted аргументы collaborators в порядке запроса
    pub fn requested(&self) -> &[(String, Vec<Instance>)] {
        &self.requested
    }

    /// Assisted аргументы, с которыми collaborator запрошен дескриптором
    pub fn requested_assisted(&self, name: &str) -> Option<&[Instance]> {
        self.requested
            .iter()
            .find(|(requested, _)| requested == name)
            .map(|(_, assisted)| assisted.as_slice())
    }
}

impl std::fmt::Debug for TestCollaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCollaborators")
            .field("sut", &self.sut)
            .field("reals", &self.reals)
            .field("mocks", &self.mocks.keys().collect::<Vec<_>>())
            .field("partial_mocks", &self.partial_mocks.keys().collect::<Vec<_>>())
            .finish()
    }
}
