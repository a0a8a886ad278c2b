//! This module defines the core data structures and types used across the change indexer.
//! It re-exports specific types like `StreamRecord` and `DocumentIdentity`.

pub mod change_envelope;
pub mod document_identity;
pub mod stream_record;

pub use change_envelope::{ChangeEnvelope, ChangeMeta};
pub use document_identity::DocumentIdentity;
pub use stream_record::StreamRecord;
