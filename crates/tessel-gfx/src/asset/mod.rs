//! Asset lifecycle contract.
//!
//! Every GPU-backed resource implements the same small set of capabilities:
//! - [`Releasable`]: drop device objects (idempotent)
//! - [`Resettable`]: recreate device objects from retained CPU-side data
//! - [`GraphicsAsset`]: `init` + `resize` on top of the two above
//!
//! [`AssetRegistry`] fans device events (loss, resize, shutdown) out to
//! registered assets without owning them.

mod lifecycle;
mod registry;

pub use lifecycle::{GraphicsAsset, Releasable, Resettable};
pub use registry::AssetRegistry;
