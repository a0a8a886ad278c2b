//! Configuration for the change indexer.
//!
//! Runtime settings come from environment variables; connection secrets come from
//! local files. [`Dependencies`] wires everything together.

mod credentials;
mod dependencies;
mod settings;

pub use credentials::{read_connection_string, BrokerProperties};
pub use dependencies::{ConnectionMode, Dependencies};
pub use settings::IndexerSettings;
