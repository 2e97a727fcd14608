use async_trait::async_trait;
use chrono::{Local, TimeZone};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use super::*;

/// `beads` table kept in memory, unique on `brand_product_code`.
struct MemoryTable {
    columns: Option<Vec<String>>,
    rows: Mutex<Vec<(i64, BeadRow)>>,
    insert_calls: Mutex<usize>,
}

impl MemoryTable {
    fn new() -> Self {
        Self::with_columns(Some(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect()))
    }

    fn with_columns(columns: Option<Vec<String>>) -> Self {
        Self {
            columns,
            rows: Mutex::new(Vec::new()),
            insert_calls: Mutex::new(0),
        }
    }

    fn seed(&self, brand_id: i64, code: &str, name: &str) {
        self.rows.lock().push((
            brand_id,
            BeadRow {
                brand_product_code: code.to_string(),
                name: Some(name.to_string()),
                ..BeadRow::default()
            },
        ));
    }

    fn row(&self, code: &str) -> Option<BeadRow> {
        self.rows
            .lock()
            .iter()
            .find(|(_, r)| r.brand_product_code == code)
            .map(|(_, r)| r.clone())
    }

    fn count(&self, brand_id: i64) -> i64 {
        self.rows.lock().iter().filter(|(b, _)| *b == brand_id).count() as i64
    }
}

#[async_trait]
impl BeadTable for MemoryTable {
    async fn column_names(&self) -> Result<Option<Vec<String>>, ImportError> {
        Ok(self.columns.clone())
    }

    async fn insert_ignoring_conflicts(
        &self,
        brand_id: i64,
        rows: &[BeadRow],
    ) -> Result<InsertOutcome, ImportError> {
        *self.insert_calls.lock() += 1;
        let count_before = self.count(brand_id);

        let mut inserted = 0;
        {
            let mut stored = self.rows.lock();
            for row in rows {
                if stored
                    .iter()
                    .any(|(_, r)| r.brand_product_code == row.brand_product_code)
                {
                    continue;
                }
                stored.push((brand_id, row.clone()));
                inserted += 1;
            }
        }

        Ok(InsertOutcome {
            count_before,
            count_after: self.count(brand_id),
            inserted,
        })
    }

    async fn existing_codes(&self, brand_id: i64) -> Result<HashSet<String>, ImportError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|(b, _)| *b == brand_id)
            .map(|(_, r)| r.brand_product_code.clone())
            .collect())
    }
}

fn write_json(dir: &Path, value: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("beads.json");
    fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path
}

#[tokio::test]
async fn imports_new_rows_and_counts_duplicates() {
    let dir = tempdir().unwrap();
    let path = write_json(
        dir.path(),
        json!([
            {"name": "Delica DB-0010", "product_code": "DB-0010", "size": "11/0", "color": "White", "finish": "Opaque"},
            {"name": "Delica DB-0011", "product_code": "DB-0011", "size": "11/0"},
            {"name": "Delica DBS-0001", "product_code": "DBS-0001", "size": "15/0", "galvanized": "Yes"},
            {"name": "no code", "product_code": ""},
            {"name": "missing code"},
        ]),
    );

    let table = MemoryTable::new();
    table.seed(1, "DB-0011", "Original name");
    let importer = BulkUpsertImporter::new(table, 1);

    let result = importer.import(&path).await.unwrap();
    assert_eq!(
        result,
        ImportResult {
            imported_count: 2,
            total_count: 5,
            duplicate_count: 1,
        }
    );
    // imported + duplicate == valid
    assert_eq!(result.imported_count + result.duplicate_count, 3);

    let table = importer.table();
    assert_eq!(
        table.row("DB-0011").unwrap().name.as_deref(),
        Some("Original name")
    );
    let white = table.row("DB-0010").unwrap();
    assert_eq!(white.color_group.as_deref(), Some("White"));
    assert_eq!(white.size.as_deref(), Some("11/0"));
    assert_eq!(
        table.row("DBS-0001").unwrap().galvanized.as_deref(),
        Some("Yes")
    );
}

#[tokio::test]
async fn second_import_is_all_duplicates() {
    let dir = tempdir().unwrap();
    let path = write_json(
        dir.path(),
        json!([{"name": "a", "product_code": "DB-0001"}, {"name": "b", "product_code": "DB-0002"}]),
    );
    let importer = BulkUpsertImporter::new(MemoryTable::new(), 1);

    importer.import(&path).await.unwrap();
    let again = importer.import(&path).await.unwrap();
    assert_eq!(again.imported_count, 0);
    assert_eq!(again.duplicate_count, 2);
}

#[tokio::test]
async fn no_valid_records_skips_insert() {
    let dir = tempdir().unwrap();
    let path = write_json(dir.path(), json!([{"name": "a"}, {"name": "b", "product_code": "  "}]));
    let importer = BulkUpsertImporter::new(MemoryTable::new(), 1);

    let result = importer.import(&path).await.unwrap();
    assert_eq!(
        result,
        ImportResult {
            imported_count: 0,
            total_count: 2,
            duplicate_count: 0,
        }
    );
    assert_eq!(*importer.table().insert_calls.lock(), 0);
}

#[tokio::test]
async fn empty_array_returns_zeros() {
    let dir = tempdir().unwrap();
    let path = write_json(dir.path(), json!([]));
    let importer = BulkUpsertImporter::new(MemoryTable::new(), 1);

    assert_eq!(importer.import(&path).await.unwrap(), ImportResult::default());
    assert_eq!(*importer.table().insert_calls.lock(), 0);
}

#[tokio::test]
async fn malformed_entries_are_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let path = write_json(
        dir.path(),
        json!([
            {"name": "Delica DB-0001", "product_code": "DB-0001"},
            {"name": "numeric code", "product_code": 42},
            "not an object",
            {"name": "Delica DB-0003", "product_code": "DB-0003", "size": ["11/0"]},
        ]),
    );
    let importer = BulkUpsertImporter::new(MemoryTable::new(), 1);

    let result = importer.import(&path).await.unwrap();
    assert_eq!(
        result,
        ImportResult {
            imported_count: 1,
            total_count: 4,
            duplicate_count: 0,
        }
    );
    assert!(importer.table().row("DB-0001").is_some());
    assert!(importer.table().row("DB-0003").is_none());
}

#[tokio::test]
async fn feed_documents_are_accepted() {
    let dir = tempdir().unwrap();
    let path = write_json(
        dir.path(),
        json!({
            "metadata": {"spider": "fire_mountain_gems", "scraped_at": "2024-05-01T00:00:00Z", "total_results": 1, "source": "x"},
            "beads": [{"name": "Delica DB10", "product_code": "DB10", "size": "11/0"}]
        }),
    );
    let importer = BulkUpsertImporter::new(MemoryTable::new(), 3);

    let result = importer.import(&path).await.unwrap();
    assert_eq!(result.imported_count, 1);
    assert_eq!(
        importer.table().existing_codes(3).await.unwrap(),
        ["DB10".to_string()].into_iter().collect()
    );
}

#[tokio::test]
async fn schema_mismatch_aborts_before_reading_file() {
    let columns = REQUIRED_COLUMNS
        .iter()
        .filter(|c| **c != "finish")
        .map(|c| c.to_string())
        .collect();
    let importer = BulkUpsertImporter::new(MemoryTable::with_columns(Some(columns)), 1);

    // The file does not exist, so reaching the read step would fail differently.
    let err = importer
        .import(Path::new("/nonexistent/beads.json"))
        .await
        .unwrap_err();
    match err {
        ImportError::SchemaMismatch { missing } => assert_eq!(missing, vec!["finish"]),
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
    assert_eq!(*importer.table().insert_calls.lock(), 0);
}

#[tokio::test]
async fn missing_table_is_reported() {
    let importer = BulkUpsertImporter::new(MemoryTable::with_columns(None), 1);
    assert!(matches!(
        importer.import(Path::new("/nonexistent/beads.json")).await,
        Err(ImportError::TableMissing)
    ));
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let importer = BulkUpsertImporter::new(MemoryTable::new(), 1);
    assert!(matches!(
        importer.import(&dir.path().join("absent.json")).await,
        Err(ImportError::FileNotFound(_))
    ));
}

#[tokio::test]
async fn malformed_json_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("beads.json");
    fs::write(&path, "[{\"product_code\": \"DB-0001\"").unwrap();
    let importer = BulkUpsertImporter::new(MemoryTable::new(), 1);
    assert!(matches!(
        importer.import(&path).await,
        Err(ImportError::Json { .. })
    ));
}

#[test]
fn archive_name_inserts_timestamp_before_extension() {
    let at = Local.with_ymd_and_hms(2024, 5, 1, 13, 45, 9).unwrap();
    assert_eq!(
        archive_name(Path::new("data/beads.json"), at),
        Path::new("data/beads_20240501_134509.json")
    );
    assert_eq!(
        archive_name(Path::new("beads"), at),
        Path::new("beads_20240501_134509")
    );
}

#[test]
fn archive_moves_the_file() {
    let dir = tempdir().unwrap();
    let path = write_json(dir.path(), json!([]));

    let archived = archive_with_timestamp(&path).unwrap();
    assert!(!path.exists());
    assert!(archived.exists());
    let name = archived.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("beads_") && name.ends_with(".json"));
}
