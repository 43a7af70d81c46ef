//! Order checkout and inventory reservation.
//!
//! The checkout workflow turns a subset of a user's cart into an order:
//! 1. Validate the requested product ids against the cart
//! 2. Pre-check every line against live stock (no writes)
//! 3. Conditionally decrement stock, recording each write in a ledger
//! 4. Persist the order
//! 5. Clear the consumed cart lines
//!
//! If step 3 or 4 fails, the ledger is replayed in reverse to restore stock.
//! The crate also hosts the order status service and the cart and catalog
//! services used by the HTTP boundary.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orders;
pub mod workflow;

pub use cart::{CartEntry, CartService};
pub use catalog::CatalogService;
pub use config::CheckoutConfig;
pub use error::{CheckoutError, FailureStage, StorefrontError};
pub use ledger::{RollbackReport, StockLedger, StockReservation};
pub use orders::OrderService;
pub use workflow::CheckoutWorkflow;
