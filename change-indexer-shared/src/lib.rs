//! # Change Indexer Shared
//!
//! This crate defines shared data structures and types used across the change indexer.
//! It includes the records consumed from the broker and the typed view used to derive
//! document identities from change event payloads.

pub mod types;

pub use types::change_envelope::{ChangeEnvelope, ChangeMeta};
pub use types::document_identity::DocumentIdentity;
pub use types::stream_record::StreamRecord;
