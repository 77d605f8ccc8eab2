//! Class index over a module's classpath and resolution of unqualified class
//! names against it.

pub mod index;
pub mod indexer;
pub mod resolve;
pub mod source;

pub use index::{ClassIndex, ClassSearchHit, SearchError, SearchType};
pub use indexer::{
    dependency_name, ClasspathIndexer, IndexError, IndexSummary, DEFAULT_MAX_CONCURRENT_ARCHIVES,
};
pub use resolve::{
    resolve_class_name, ResolutionKind, ResolutionResult, IMPLICIT_CLASSES, IMPLICIT_PACKAGE,
};
pub use source::{parse_imports, parse_package, SourceContext};
