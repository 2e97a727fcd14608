mod error;
mod importer;
mod postgres;
mod table;

#[cfg(test)]
mod tests;

pub use error::ImportError;
pub use importer::{archive_name, archive_with_timestamp, BulkUpsertImporter, ImportResult};
pub use postgres::{connect_pool, PgBeadTable};
pub use table::{BeadRow, BeadTable, InsertOutcome, REQUIRED_COLUMNS};
