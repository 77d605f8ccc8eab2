//! Maven module resolution.
//!
//! A build descriptor is turned into an immutable [`ModuleContext`] by one of
//! two [`ModuleResolver`] strategies: the built-in [`DescriptorResolver`] or
//! the [`ExternalToolResolver`] which delegates to `mvn dependency:list`.
//! [`ResolverFactory`] selects between them from [`MavenConfig`], and
//! [`LocalRepository`] fills in archive paths from `~/.m2`.

pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod external;
pub mod model;
pub mod repository;
pub mod resolver;

pub use config::{MavenConfig, MavenConfigLayer};
pub use descriptor::{DescriptorResolver, DIRECT_RESOLVER_NAME};
pub use discovery::{find_descriptor, DESCRIPTOR_FILE_NAME};
pub use error::ResolveError;
pub use external::{
    parse_dependency_list, DependencyListReport, ExternalToolResolver, INVOKER_RESOLVER_NAME,
};
pub use model::{
    DependencyInfo, ModuleContext, ModuleContextBuilder, Scope, UnknownScope, UNKNOWN_VERSION,
};
pub use repository::LocalRepository;
pub use resolver::{ModuleResolver, ResolverFactory, ResolverKind};
