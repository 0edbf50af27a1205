//! Именованный DI контейнер.
//!
//! ```
//! use std::sync::Arc;
//! use injector::{Constructor, InjectableMeta, Injector, Subject};
//!
//! struct Greeter {
//!     greeting: Arc<String>,
//! }
//!
//! let injector = Injector::new("docs");
//! injector
//!     .group("app")
//!     .with("greeting", Subject::value("hello".to_string()))
//!     .with(
//!         "greeter",
//!         Constructor::new(|greeting: Arc<String>| Arc::new(Greeter { greeting }))
//!             .annotate(InjectableMeta::new().singleton().param("greeting")),
//!     )
//!     .commit()?;
//!
//! let greeter = injector.resolve::<Greeter>("greeter")?;
//! assert_eq!(greeter.greeting.as_str(), "hello");
//! # Ok::<(), injector::InjectorError>(())
//! ```

pub mod dependency_graph;
pub mod errors;
pub mod injectable;
pub mod injector;
pub mod instance;
pub mod metadata;
pub mod module_group;
pub mod scope;
pub mod scope_cache;
pub mod subject;

pub use dependency_graph::{DependencyGraph, DependencyGraphStats, EdgeLabel, VertexKind};
pub use errors::{InjectorError, InjectorResult};
pub use injectable::InjectableRecord;
pub use injector::{
    Injector, Instancer, ModuleGroupBuilder, ResolutionContext, ResolutionHook, DEFAULT_MODULE_GROUP,
};
pub use instance::{FromInstance, Instance, IntoInstance};
pub use metadata::{InjectableMeta, Param};
pub use module_group::ModuleGroup;
pub use scope::{InjectableType, Scope};
pub use scope_cache::CacheStats;
pub use subject::{Constructor, FixedValue, Instantiate, Invocable, Provider, Subject};
