//! Chain status state machine.
//!
//! Evaluated every run for every chain except terminal-by-user states:
//!
//! | prior          | net qty = 0     | net qty != 0         |
//! |----------------|-----------------|----------------------|
//! | unset/ACTIVE   | CLOSED          | ACTIVE               |
//! | CLOSED         | stays CLOSED    | ACTIVE (reopened)    |
//! | FINAL          | no-op           | fatal error          |
//! | IGNORE         | no-op           | no-op                |
//!
//! The table applies only when every transaction the chain binds is
//! present in the window. A chain whose ids reach outside the window
//! has a truncated net, so its status carries forward unchanged and
//! the FINAL check does not fire.

use crate::domain::{ChainStatus, ChainsDb, Decimal, Transaction, TransactionId};
use crate::error::ImportError;
use std::collections::{BTreeMap, HashMap};

/// Applies the status state machine and enforces the FINAL closure
/// invariant.
pub struct ChainStatusResolver;

impl ChainStatusResolver {
    /// Resolve statuses in place.
    ///
    /// # Errors
    /// `ImportError::InvariantViolation` for a FINAL chain with nonzero
    /// net open quantity in any of its instruments.
    pub fn resolve(db: &mut ChainsDb, transactions: &[Transaction]) -> Result<(), ImportError> {
        let by_id: HashMap<&TransactionId, &Transaction> = transactions
            .iter()
            .map(|t| (&t.transaction_id, t))
            .collect();

        for chain in &mut db.chains {
            if chain.status == ChainStatus::Ignore {
                continue;
            }

            // Net signed quantity per instrument across the chain's
            // transactions present in this window. The last transaction's
            // running total equals the sum over all of them.
            let mut nets: BTreeMap<&str, Decimal> = BTreeMap::new();
            let mut seen_any = false;
            let mut missing_any = false;
            for id in chain.all_ids() {
                match by_id.get(id) {
                    Some(txn) => {
                        seen_any = true;
                        let net =
                            nets.entry(txn.symbol.as_str()).or_insert_with(Decimal::zero);
                        *net = *net + txn.signed_quantity();
                    }
                    // Historical id outside this window; already reported
                    // as a reference mismatch during partitioning.
                    None => missing_any = true,
                }
            }

            match chain.status {
                ChainStatus::Final => {
                    // The closure check needs every bound transaction;
                    // with part of the chain outside the window the net
                    // says nothing about the real position.
                    if missing_any {
                        continue;
                    }
                    if let Some((symbol, quantity)) =
                        nets.iter().find(|(_, q)| !q.is_zero())
                    {
                        return Err(ImportError::InvariantViolation {
                            chain_id: chain.chain_id.clone(),
                            symbol: symbol.to_string(),
                            quantity: *quantity,
                        });
                    }
                }
                ChainStatus::Active | ChainStatus::Closed => {
                    // A chain with no transactions in this window, or
                    // only some of them, keeps its carried-forward
                    // status; a truncated net must not flip it.
                    if seen_any && !missing_any {
                        chain.status = if nets.values().all(|q| q.is_zero()) {
                            ChainStatus::Closed
                        } else {
                            ChainStatus::Active
                        };
                    }
                }
                ChainStatus::Ignore => unreachable!("ignored above"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, Chain, ChainId, RowType, Side};
    use chrono::NaiveDate;

    fn txn(id: &str, instruction: Side, quantity: i64) -> Transaction {
        Transaction {
            transaction_id: TransactionId::new(id),
            datetime: NaiveDate::from_ymd_opt(2021, 6, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            account: AccountId::new("main"),
            symbol: "SPY".to_string(),
            instruction,
            quantity: Decimal::from_i64(quantity),
            cost: Decimal::zero(),
            rowtype: RowType::Transaction,
            chain_id: None,
        }
    }

    fn chain_with(status: ChainStatus, auto_ids: &[&str]) -> Chain {
        let mut chain = Chain::new(ChainId::new("c1"));
        chain.status = status;
        chain.auto_ids = auto_ids.iter().map(|s| TransactionId::new(*s)).collect();
        chain
    }

    #[test]
    fn test_active_with_zero_net_becomes_closed() {
        let txns = vec![txn("t1", Side::Buy, 10), txn("t2", Side::Sell, 10)];
        let mut db = ChainsDb::new();
        db.chains.push(chain_with(ChainStatus::Active, &["t1", "t2"]));
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Closed);
    }

    #[test]
    fn test_active_with_open_net_stays_active() {
        let txns = vec![txn("t1", Side::Buy, 10), txn("t2", Side::Sell, 4)];
        let mut db = ChainsDb::new();
        db.chains.push(chain_with(ChainStatus::Active, &["t1", "t2"]));
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Active);
    }

    #[test]
    fn test_closed_chain_reopens_on_new_inventory() {
        let txns = vec![
            txn("t1", Side::Buy, 10),
            txn("t2", Side::Sell, 10),
            txn("t3", Side::Buy, 5),
        ];
        let mut db = ChainsDb::new();
        db.chains
            .push(chain_with(ChainStatus::Closed, &["t1", "t2", "t3"]));
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Active);
    }

    #[test]
    fn test_final_closed_is_noop() {
        let txns = vec![txn("t1", Side::Buy, 10), txn("t2", Side::Sell, 10)];
        let mut db = ChainsDb::new();
        db.chains.push(chain_with(ChainStatus::Final, &["t1", "t2"]));
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Final);
    }

    #[test]
    fn test_final_open_is_fatal() {
        let txns = vec![txn("t1", Side::Buy, 10)];
        let mut db = ChainsDb::new();
        db.chains.push(chain_with(ChainStatus::Final, &["t1"]));
        let err = ChainStatusResolver::resolve(&mut db, &txns).unwrap_err();
        assert!(matches!(err, ImportError::InvariantViolation { .. }));
    }

    #[test]
    fn test_ignore_is_untouched() {
        let txns = vec![txn("t1", Side::Buy, 10)];
        let mut db = ChainsDb::new();
        db.chains.push(chain_with(ChainStatus::Ignore, &["t1"]));
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Ignore);
    }

    #[test]
    fn test_final_chain_with_historical_opening_leg_passes() {
        // The opening buy predates this window; only the close shows,
        // which alone nets short. The invariant cannot be judged.
        let txns = vec![txn("t1", Side::Sell, 10)];
        let mut chain = chain_with(ChainStatus::Final, &[]);
        chain.ids = vec![TransactionId::new("t0"), TransactionId::new("t1")];
        let mut db = ChainsDb::new();
        db.chains.push(chain);
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Final);
    }

    #[test]
    fn test_partially_windowed_chain_keeps_carried_status() {
        // t0 is historical; the truncated net of t1 alone must not
        // reopen the chain.
        let txns = vec![txn("t1", Side::Sell, 10)];
        let mut chain = chain_with(ChainStatus::Closed, &["t1"]);
        chain.ids = vec![TransactionId::new("t0")];
        let mut db = ChainsDb::new();
        db.chains.push(chain);
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Closed);
    }

    #[test]
    fn test_chain_outside_window_keeps_status() {
        let txns: Vec<Transaction> = Vec::new();
        let mut db = ChainsDb::new();
        db.chains.push(chain_with(ChainStatus::Closed, &["t9"]));
        ChainStatusResolver::resolve(&mut db, &txns).unwrap();
        assert_eq!(db.chains[0].status, ChainStatus::Closed);
    }
}
