//! Pure computation engines for the deterministic reconciliation pass.

pub mod inventory;
pub mod mark;
pub mod partition;
pub mod status;
pub mod targets;

pub use inventory::{InitialPosition, InventoryBook, InventoryMatcher, MatchedLedger, Position};
pub use mark::{MarkEngine, PriceMap};
pub use partition::{ChainPartitioner, PartitionOutcome};
pub use status::ChainStatusResolver;
pub use targets::{ChainTargets, TargetCalculator};
