//! # Entity Component System
//!
//! Storage side of the runtime.
//!
//! ## Design Philosophy
//!
//! - Components are stored in dense, entity-indexed byte columns
//! - Entity IDs are plain indices, never recycled
//! - Selection is a bitmask test, no archetype bookkeeping

mod component;
pub mod context;
mod entity;
mod mask;
pub mod query;
mod storage;
mod world;

pub use component::{Component, ComponentId, ComponentType};
pub use context::{default_prepare, ComponentHandle, PrepareFn, SystemContext};
pub use entity::{EntityId, EntityTable};
pub use mask::{ComponentMask, MAX_COMPONENTS};
pub use query::{EntityRange, Query, RunDetector};
pub use storage::{ComponentStorage, StorageError, STORAGE_ALIGN};
pub use world::World;
