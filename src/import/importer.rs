use chrono::{DateTime, Local};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::{BeadRow, BeadTable, ImportError, REQUIRED_COLUMNS};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub total_count: usize,
    pub duplicate_count: usize,
}

/// A crawled record as read back for import. Every field is optional; an
/// entry whose fields have the wrong types is skipped by [`load_beads`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ImportBead {
    product_code: Option<String>,
    name: Option<String>,
    shape: Option<String>,
    size: Option<String>,
    color: Option<String>,
    glass_group: Option<String>,
    finish: Option<String>,
    dyed: Option<String>,
    galvanized: Option<String>,
    plating: Option<String>,
}

/// Streamed output is a bare array; feed output wraps it in `{metadata, beads}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Array(Vec<Value>),
    Feed { beads: Vec<Value> },
}

impl ImportBead {
    fn into_row(self) -> Option<BeadRow> {
        let code = self.product_code.filter(|c| !c.trim().is_empty())?;
        Some(BeadRow {
            brand_product_code: code,
            name: self.name,
            shape: self.shape,
            size: self.size,
            color_group: self.color,
            glass_group: self.glass_group,
            finish: self.finish,
            dyed: self.dyed,
            galvanized: self.galvanized,
            plating: self.plating,
        })
    }
}

pub struct BulkUpsertImporter<T> {
    table: T,
    brand_id: i64,
}

impl<T: BeadTable> BulkUpsertImporter<T> {
    pub fn new(table: T, brand_id: i64) -> Self {
        Self { table, brand_id }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub async fn check_schema(&self) -> Result<(), ImportError> {
        let Some(columns) = self.table.column_names().await? else {
            error!("Table 'beads' does not exist");
            return Err(ImportError::TableMissing);
        };

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !columns.iter().any(|c| c == *required))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            error!("Missing columns in beads table: {:?}", missing);
            info!("Available columns: {:?}", columns);
            return Err(ImportError::SchemaMismatch { missing });
        }

        info!("Database schema check passed");
        Ok(())
    }

    pub async fn import(&self, path: &Path) -> Result<ImportResult, ImportError> {
        info!("Starting import of {}", path.display());
        self.check_schema().await?;

        let beads = load_beads(path)?;
        let total_count = beads.len();
        if beads.is_empty() {
            warn!("No beads found in {}", path.display());
            return Ok(ImportResult::default());
        }

        let rows: Vec<BeadRow> = beads
            .into_iter()
            .flatten()
            .filter_map(|bead| {
                let row = bead.into_row();
                if row.is_none() {
                    warn!("Bead missing product_code, skipping");
                }
                row
            })
            .collect();

        if rows.is_empty() {
            info!("No valid beads found (all malformed or missing product codes)");
            return Ok(ImportResult {
                imported_count: 0,
                total_count,
                duplicate_count: 0,
            });
        }

        info!(
            "Attempting to import {} beads (duplicates will be ignored)",
            rows.len()
        );
        let outcome = self
            .table
            .insert_ignoring_conflicts(self.brand_id, &rows)
            .await?;

        let counted = outcome.count_after - outcome.count_before;
        if counted != outcome.inserted as i64 {
            warn!(
                "Insert reported {} new rows but the brand count moved by {}; another writer may be active",
                outcome.inserted, counted
            );
        }

        let result = ImportResult {
            imported_count: outcome.inserted,
            total_count,
            duplicate_count: rows.len() - outcome.inserted,
        };
        info!("Total beads in file: {}", result.total_count);
        info!("New beads imported: {}", result.imported_count);
        info!("Duplicates ignored: {}", result.duplicate_count);
        Ok(result)
    }
}

/// Every entry of the file, in order; `None` marks one that is not a bead.
fn load_beads(path: &Path) -> Result<Vec<Option<ImportBead>>, ImportError> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let file: ImportFile = serde_json::from_str(&text).map_err(|source| ImportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = match file {
        ImportFile::Array(entries) | ImportFile::Feed { beads: entries } => entries,
    };
    info!("Loaded {} beads from {}", entries.len(), path.display());

    let beads = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match serde_json::from_value::<ImportBead>(entry) {
            Ok(bead) => Some(bead),
            Err(e) => {
                warn!("Skipping malformed bead at index {}: {}", index, e);
                None
            }
        })
        .collect();
    Ok(beads)
}

/// `data/beads.json` at 2024-05-01 13:45:09 becomes `data/beads_20240501_134509.json`.
pub fn archive_name(path: &Path, at: DateTime<Local>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!(
            "{}_{}.{}",
            stem,
            at.format("%Y%m%d_%H%M%S"),
            ext.to_string_lossy()
        ),
        None => format!("{}_{}", stem, at.format("%Y%m%d_%H%M%S")),
    };
    path.with_file_name(name)
}

/// Renames an imported file out of the way so the next crawl starts fresh.
pub fn archive_with_timestamp(path: &Path) -> Result<PathBuf, ImportError> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.to_path_buf()));
    }
    let target = archive_name(path, Local::now());
    fs::rename(path, &target)?;
    info!("Renamed JSON file: {} -> {}", path.display(), target.display());
    Ok(target)
}
