//! Processor module for the change indexer.
//!
//! Turns change records into upsert requests.

mod record_processor;

pub use record_processor::{object_depth, RecordProcessor};
