use async_trait::async_trait;
use std::collections::HashSet;

use super::ImportError;

/// Columns the importer writes; the table must carry all of them.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "brand_product_code",
    "name",
    "brand_id",
    "shape",
    "size",
    "color_group",
    "glass_group",
    "finish",
    "dyed",
    "galvanized",
    "plating",
    "created_at",
    "updated_at",
];

/// One row of the `beads` table, minus `brand_id` and the timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeadRow {
    pub brand_product_code: String,
    pub name: Option<String>,
    pub shape: Option<String>,
    pub size: Option<String>,
    pub color_group: Option<String>,
    pub glass_group: Option<String>,
    pub finish: Option<String>,
    pub dyed: Option<String>,
    pub galvanized: Option<String>,
    pub plating: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub count_before: i64,
    pub count_after: i64,
    /// Rows the insert itself reported as written.
    pub inserted: usize,
}

#[async_trait]
pub trait BeadTable: Send + Sync {
    /// Column names of `public.beads`, or `None` when the table is absent.
    async fn column_names(&self) -> Result<Option<Vec<String>>, ImportError>;

    /// Inserts `rows` for `brand_id` in a single transaction, skipping rows
    /// whose code already exists. Nothing is written if any step fails.
    async fn insert_ignoring_conflicts(
        &self,
        brand_id: i64,
        rows: &[BeadRow],
    ) -> Result<InsertOutcome, ImportError>;

    async fn existing_codes(&self, brand_id: i64) -> Result<HashSet<String>, ImportError>;
}
