//! Shared type definitions for the PLC data-plane simulator.
//!
//! This crate is the single source of truth for the tag data model used
//! across the workspace: the declared data types a tag can carry, the
//! typed runtime values, value coercion, and the descriptor/sample
//! records exchanged with the external Publisher.
//!
//! # Modules
//!
//! - [`value`] -- Declared data types, typed runtime values, and coercion
//! - [`descriptor`] -- Tag addresses, access policy, and the records
//!   exposed to the Publisher (descriptors and per-tick samples)

pub mod descriptor;
pub mod value;

// Re-export all public types at crate root for convenience.
pub use descriptor::{AccessType, TagAddress, TagDescriptor, TagSample};
pub use value::{Bounds, CoercionError, DataType, Quality, RawValue, TagValue};
