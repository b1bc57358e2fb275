//! Brewpos - coffee-shop sales ledger
//!
//! Records sales and keeps two SQL stores in step: a transactional primary
//! (PostgreSQL, or SQLite locally) that owns id assignment, and a
//! self-committing secondary (Cloud Spanner through its PostgreSQL
//! interface, or SQLite locally). Every write goes through the
//! [`DualWriteCoordinator`], which commits the primary only after the
//! secondary has accepted the same change.
//!
//! ```no_run
//! use brewpos::{Config, DualWriteCoordinator, SaleDraft, SalesFilter};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let sales = DualWriteCoordinator::connect(&config.storage).await?;
//!
//! let id = sales
//!     .insert(config.mode, SaleDraft::new("Latte", 1, Decimal::new(4, 0)))
//!     .await?;
//! let recent = sales.list(config.mode, &SalesFilter::all().limit(20)).await?;
//! # let _ = (id, recent);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod interfaces;
pub mod model;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use coordinator::{DualWriteCoordinator, StoreMode, StoreTimeouts, SyncError};
pub use interfaces::{ErrorKind, StoreError};
pub use model::{Mutation, Operation, RecordId, SaleDraft, SalesFilter, SalesRecord};
