pub mod bead;
pub mod builder;

pub use bead::{BeadRecord, DetailAttributes, DetailField, PartialBead, RecordStage};
pub use builder::{ProductRecordBuilder, TileOutcome};
