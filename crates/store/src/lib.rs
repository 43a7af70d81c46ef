//! Persistence interfaces consumed by the checkout workflow.
//!
//! Three narrow traits describe what the core needs from storage:
//! [`ProductStore`], [`CartStore`] and [`OrderStore`]. Two backends implement
//! all of them: [`InMemoryStore`] for tests and single-process runs, and
//! [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CartStore, OrderStore, ProductStore};
