//! Abstract interfaces for brewpos components.
//!
//! These traits define the contracts for:
//! - Reading sales back out of a store (`SalesReader`)
//! - The transactional primary store (`PrimaryStore`, `PrimaryTx`)
//! - The self-committing secondary store (`SecondaryStore`)

pub mod store;

pub use store::{
    ErrorKind, PrimaryStore, PrimaryTx, Result, SalesReader, SecondaryStore, StoreError,
};
