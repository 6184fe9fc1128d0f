use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::MaterialCatalog;
use crate::domain::tool::{InventoryReport, ToolError};

#[async_trait]
pub trait InventoryTool: Send + Sync {
    async fn check_inventory(
        &self,
        paper_stock: &str,
        color: &str,
        finish: &str,
    ) -> Result<InventoryReport, ToolError>;
}

/// Answers stock questions from the in-process material catalog.
pub struct CatalogInventoryTool {
    catalog: Arc<MaterialCatalog>,
}

impl CatalogInventoryTool {
    pub fn new(catalog: Arc<MaterialCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl InventoryTool for CatalogInventoryTool {
    async fn check_inventory(
        &self,
        paper_stock: &str,
        color: &str,
        finish: &str,
    ) -> Result<InventoryReport, ToolError> {
        let entry = self.catalog.entry(paper_stock, color, finish).ok_or_else(|| {
            ToolError::UnknownMaterial {
                detail: format!("{paper_stock}/{color}/{finish} is not stocked"),
            }
        })?;

        Ok(InventoryReport {
            paper_stock: entry.paper_stock.clone(),
            color: entry.color.clone(),
            finish: entry.finish.clone(),
            available_sheets: entry.available_sheets,
        })
    }
}
