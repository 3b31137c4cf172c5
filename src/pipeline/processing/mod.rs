// Silver processing: standardization, validation, cleaning and routing

pub mod buffer;
pub mod cleaners;
pub mod combine;
pub mod context;
pub mod keys;
pub mod quality;
pub mod registry;
pub mod standardize;
pub mod validate;

pub use context::SilverContext;
pub use quality::{IssueKind, QualityIssue, QualityLog, Severity};
pub use registry::{CleanerRegistry, RouteOutcome, TableFamily};
