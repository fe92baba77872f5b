//! muster-core library.
//!
//! A live, normalized read model over four remote document collections
//! (employees, departments, designations, penalties), the derived penalty
//! views computed from it, and the write paths back to the store.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums with an [`error::ErrorCode`];
//!   `anyhow::Result` for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
//! - **State**: read-model slices are replaced whole, never patched.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod memory;
pub mod model;
pub mod mutation;
pub mod normalize;
pub mod query;
pub mod remote;
pub mod stats;
pub mod store;
pub mod workflow;

pub use error::ErrorCode;
pub use normalize::{NormalizeError, Normalized, normalize};
pub use query::{DateRange, DepartmentFilter, SearchFilters, StatusFilter, filter};
pub use stats::{Stats, summarize};
pub use store::{ReadModel, SliceStatus, StoreEvent, SyncFailure, SyncStore};
