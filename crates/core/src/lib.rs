pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod tools;

pub use catalog::{ColorFamily, MaterialCatalog};
pub use domain::order::{FileReference, MaterialSpec, OrderSpec, OrderSpecInput, PriceRequest};
pub use domain::price::Price;
pub use domain::tool::{InventoryReport, ResolutionReport, ToolError, ToolOutput, ToolResult};
pub use domain::verdict::{GuardrailLayer, GuardrailVerdict, Severity, Violation};
pub use errors::DomainError;
