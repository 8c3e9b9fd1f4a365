//! Foundation types for ModelVault.
//!
//! Every other ModelVault crate depends on `mvault-types`. The types here are
//! plain values: they carry no filesystem state and perform no I/O.
//!
//! # Key Types
//!
//! - [`Name`] -- Hierarchical model name (namespace / repository / tag)
//! - [`Layer`] -- One content-addressed blob referenced by a manifest
//! - [`Digest`] -- Validated `sha256:<hex>` content identifier

pub mod digest;
pub mod error;
pub mod layer;
pub mod name;

pub use digest::Digest;
pub use error::TypeError;
pub use layer::Layer;
pub use name::Name;
