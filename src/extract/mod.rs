pub mod code;
pub mod size;

pub use code::{CodeExtractor, CodeFormat, CodePattern, ProductCode};
pub use size::{SizeEntry, SizeTable, UNKNOWN_SIZE};
