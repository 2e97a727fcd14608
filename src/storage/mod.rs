pub mod base;
pub mod feed;
pub mod stream;

pub use base::{RecordSink, StorageError};
pub use feed::{FeedDocument, FeedMetadata, FeedSink};
pub use stream::StreamingJsonSink;
