pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod source;

pub use config::{Config, Settings};
pub use db::{load_chains_db, store_chains_db};
pub use domain::{
    AccountId, Chain, ChainId, ChainStatus, ChainsDb, Decimal, Instrument, RowType, Side,
    Transaction, TransactionId,
};
pub use engine::{
    ChainPartitioner, ChainStatusResolver, InitialPosition, InventoryBook, InventoryMatcher,
    MarkEngine, MatchedLedger, PriceMap, TargetCalculator,
};
pub use error::{ImportError, ImportReport, ImportWarning};
pub use pipeline::{run_import, run_import_with, ImportResult};
pub use source::{SourceRegistry, TransactionSource};
