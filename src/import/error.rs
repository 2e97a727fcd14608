use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("table `beads` does not exist")]
    TableMissing,

    #[error("missing columns in beads table: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("JSON file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
