//! # Sociable tests
//!
//! Поддержка sociable unit тестов поверх [`injector::Injector`]: SUT и его
//! зависимости создаются настоящими, boundary injectables подменяются
//! mock'ами, а partial mock'и оборачивают настоящий экземпляр в spy.
//!
//! ```
//! use std::sync::Arc;
//! use injector::{Constructor, InjectableMeta, Injector, Instance};
//! use sociable::{Collaborator, DoubleRegistry, SociableInjector};
//!
//! let injector = Injector::new("docs");
//! injector
//!     .group("app")
//!     .with(
//!         "port",
//!         Constructor::new(|| Arc::new(8080u16)).annotate(InjectableMeta::new().singleton().boundary()),
//!     )
//!     .with(
//!         "address",
//!         Constructor::new(|port: Arc<u16>| Arc::new(format!("localhost:{port}")))
//!             .annotate(InjectableMeta::new().param("port")),
//!     )
//!     .commit()
//!     .unwrap();
//!
//! let doubles = DoubleRegistry::new().with_mock("port", || 0u16, Instance::new);
//! let sociable = SociableInjector::new(injector, doubles);
//!
//! let test = sociable.begin_test();
//! let instances = test.collaborators(vec![Collaborator::sut("address")]).unwrap();
//! assert_eq!(*instances[0].downcast::<String>().unwrap(), "localhost:0");
//! ```

pub mod classification;
pub mod collaborator;
pub mod doubles;
pub mod errors;
pub mod sociable_injector;

pub use classification::{Classification, TestCollaborators};
pub use collaborator::{customizer, Collaborator, Customizer};
pub use doubles::{Customize, DoubleRegistry, Spy, SpyLog, TestDoubles};
pub use errors::{ClassificationError, SociableError};
pub use sociable_injector::{SociableInjector, TestCase};
