//! certladder-store: results-store and identity-store backends.
//!
//! Implements the `ResultsStore` and `IdentityProvider` traits from
//! certladder-core with in-memory, JSON-lines and mock backends, plus the
//! `certladder.toml` configuration layer that selects between them.

pub mod config;
pub mod error;
pub mod jsonl;
pub mod memory;
pub mod mock;

pub use config::{create_store, load_config, load_config_from, CertladderConfig, StoreConfig};
pub use error::StoreError;
pub use jsonl::JsonlResultsStore;
pub use memory::{MemoryIdentityProvider, MemoryResultsStore};
pub use mock::MockResultsStore;
