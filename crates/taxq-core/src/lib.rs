//! taxq-core library.
//!
//! The workqueue of a tax-preparation firm: work items, the status and
//! extension catalogs, the queue reconciler that keeps the staff-facing and
//! client-facing rank sequences dense, and the SQLite store that runs each
//! mutation plus its reconciliation as one transaction.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::QueueError`]; filesystem
//!   and config helpers use `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod lookup;
pub mod model;
pub mod reconcile;
pub mod validate;

pub use error::{ErrorCode, QueueError};
