//! Deterministic domain tools consumed by the agent and the guardrails.
//!
//! Each tool is an async trait so that remote or disk-backed implementations
//! can be swapped in; the bundled implementations answer from the material
//! catalog, from artwork headers and from fixed-point pricing rules.

pub mod inventory;
pub mod pricing;
pub mod resolution;

pub use inventory::{CatalogInventoryTool, InventoryTool};
pub use pricing::{price_order, DeterministicPricingTool, PricingTool, RushTier};
pub use resolution::{
    ArtworkStore, FsArtworkStore, ImageResolutionTool, InMemoryArtworkStore, ResolutionTool,
};
