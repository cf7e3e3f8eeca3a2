//! # Error Types
//!
//! All errors that can occur while registering, allocating, or scheduling.
//! Ticking itself never fails once the execution plan is built.

use thiserror::Error;

/// Errors that can occur in the ECS runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecsError {
    /// A system named a component that has not been registered.
    #[error("system \"{system}\": could not find id for component name \"{component}\"")]
    UnknownComponent {
        /// The system being registered.
        system: String,
        /// The unresolved component name.
        component: String,
    },

    /// A system named a dependency that has not been registered.
    #[error("system \"{system}\": could not find id for dependency system name \"{dependency}\"")]
    UnknownDependency {
        /// The system declaring the dependency.
        system: String,
        /// The unresolved system name.
        dependency: String,
    },

    /// A component type with this name already exists.
    #[error("component \"{0}\" is already registered")]
    DuplicateComponent(String),

    /// A system with this name already exists.
    #[error("system \"{0}\" is already registered")]
    DuplicateSystem(String),

    /// The component mask cannot address another component type.
    #[error("component limit reached: at most {limit} component types")]
    TooManyComponents {
        /// Maximum number of component types.
        limit: usize,
    },

    /// The component type needs a stricter alignment than column storage offers.
    #[error("component \"{component}\" requires alignment {align}, storage provides {supported}")]
    UnsupportedAlignment {
        /// Component name.
        component: String,
        /// Alignment of the Rust type.
        align: usize,
        /// Alignment guaranteed by the column storage.
        supported: usize,
    },

    /// A typed view does not match the column layout.
    #[error("component \"{component}\": element size {element_size} does not fit type of size {type_size}")]
    LayoutMismatch {
        /// Component name.
        component: String,
        /// Registered element size in bytes.
        element_size: usize,
        /// Size of the requested Rust type.
        type_size: usize,
    },

    /// Batch systems receive contiguous ranges and cannot filter by exclusion.
    #[error("batch system \"{0}\" cannot declare excluded components")]
    BatchExclusion(String),

    /// Growing entity or component storage failed.
    #[error("allocation failed while growing storage for {entities} entities")]
    AllocationFailed {
        /// Entity count the storage was being grown to.
        entities: usize,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {cycle}")]
    DependencyCycle {
        /// The systems forming the cycle, `a -> b -> a`.
        cycle: String,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O failure while reading config or writing diagnostics.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DecsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for ECS operations.
pub type DecsResult<T> = Result<T, DecsError>;
