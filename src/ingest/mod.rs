//! Feed ingestion pipeline
//!
//! Pure, storage-free building blocks: byte decoding, multi-file merging,
//! row tokenization and the column mapping/transform engine. The service
//! layer (`services::import`) wires these together against the repository.

pub mod encoding;
pub mod mapping;
pub mod merger;
pub mod rows;

pub use encoding::{decode_feed, decode_feed_with_hint, DecodedFeed};
pub use mapping::{MappedRow, MappingEngine, MappingError};
pub use merger::FeedMerger;
pub use rows::{sniff_delimiter, RowSet};
