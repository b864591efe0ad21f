//! Domain types and determinism layer for the chain reconciler.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: AccountId, TransactionId, ChainId, Side, RowType
//! - Transaction and Chain records with stable serialization
//! - Normalized instrument parsing and family keys
//! - Stable transaction ordering for deterministic processing

pub mod chain;
pub mod decimal;
pub mod instrument;
pub mod ordering;
pub mod primitives;
pub mod transaction;

pub use chain::{Chain, ChainsDb};
pub use decimal::Decimal;
pub use instrument::{Instrument, InstrumentError, InstrumentKind, PutCall};
pub use ordering::{sort_transactions, TxnOrderingKey};
pub use primitives::{AccountId, ChainId, ChainStatus, RowType, Side, TransactionId};
pub use transaction::Transaction;
