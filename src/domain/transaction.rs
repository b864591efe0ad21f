//! Transaction type representing a single broker event.

use crate::domain::{AccountId, ChainId, Decimal, RowType, Side, TransactionId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One broker event in the normalized ledger.
///
/// `quantity` is non-negative; the sign of the position effect comes from
/// `instruction`. `cost` is the total signed cash effect of the event
/// (negative for a debit, positive for a credit), not per-unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier within the account's full history.
    pub transaction_id: TransactionId,
    /// Event time.
    pub datetime: NaiveDateTime,
    /// Owning account.
    pub account: AccountId,
    /// Normalized instrument symbol.
    pub symbol: String,
    /// BUY or SELL.
    pub instruction: Side,
    /// Non-negative traded quantity.
    pub quantity: Decimal,
    /// Total signed cash effect.
    pub cost: Decimal,
    /// Row kind: real transaction, synthesized opening, or mark.
    #[serde(default)]
    pub rowtype: RowType,
    /// Chain assignment; written only by the partitioner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
}

impl Transaction {
    /// Position effect of this row: +quantity for BUY, -quantity for SELL.
    pub fn signed_quantity(&self) -> Decimal {
        match self.instruction {
            Side::Buy => self.quantity,
            Side::Sell => -self.quantity,
        }
    }

    /// Mint a synthetic transaction id for engine-generated rows.
    ///
    /// The id is a prefixed hash over the deterministic fields so re-runs
    /// regenerate the same id instead of accumulating new rows.
    pub fn synthetic_id(
        prefix: &str,
        account: &AccountId,
        symbol: &str,
        datetime: NaiveDateTime,
        instruction: Side,
        quantity: &Decimal,
        cost: &Decimal,
    ) -> TransactionId {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(account.as_str());
        hasher.update(symbol);
        hasher.update(datetime.and_utc().timestamp().to_le_bytes());
        hasher.update(if instruction == Side::Buy { b"B" } else { b"S" });
        hasher.update(quantity.to_canonical_string());
        hasher.update(cost.to_canonical_string());
        let hash = hasher.finalize();
        TransactionId::new(format!("{}:{}", prefix, hex::encode(&hash[..8])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn txn(id: &str, instruction: Side, quantity: &str, cost: &str) -> Transaction {
        Transaction {
            transaction_id: TransactionId::new(id),
            datetime: dt("2021-06-01"),
            account: AccountId::new("main"),
            symbol: "SPY".to_string(),
            instruction,
            quantity: Decimal::from_str_canonical(quantity).unwrap(),
            cost: Decimal::from_str_canonical(cost).unwrap(),
            rowtype: RowType::Transaction,
            chain_id: None,
        }
    }

    #[test]
    fn test_signed_quantity() {
        assert_eq!(
            txn("t1", Side::Buy, "10", "-4200").signed_quantity(),
            Decimal::from_i64(10)
        );
        assert_eq!(
            txn("t2", Side::Sell, "10", "4200").signed_quantity(),
            Decimal::from_i64(-10)
        );
    }

    #[test]
    fn test_synthetic_id_deterministic() {
        let account = AccountId::new("main");
        let quantity = Decimal::from_i64(10);
        let cost = Decimal::from_i64(-4200);
        let a = Transaction::synthetic_id(
            "synth",
            &account,
            "SPY",
            dt("2021-06-01"),
            Side::Buy,
            &quantity,
            &cost,
        );
        let b = Transaction::synthetic_id(
            "synth",
            &account,
            "SPY",
            dt("2021-06-01"),
            Side::Buy,
            &quantity,
            &cost,
        );
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("synth:"));
    }

    #[test]
    fn test_synthetic_id_varies_with_fields() {
        let account = AccountId::new("main");
        let quantity = Decimal::from_i64(10);
        let cost = Decimal::from_i64(-4200);
        let a = Transaction::synthetic_id(
            "synth",
            &account,
            "SPY",
            dt("2021-06-01"),
            Side::Buy,
            &quantity,
            &cost,
        );
        let b = Transaction::synthetic_id(
            "synth",
            &account,
            "QQQ",
            dt("2021-06-01"),
            Side::Buy,
            &quantity,
            &cost,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_transaction_serde_roundtrip() {
        let mut t = txn("t1", Side::Buy, "10", "-4200");
        t.chain_id = Some(ChainId::new("main.210601_100000.SPY"));
        let yaml = serde_yaml::to_string(&t).unwrap();
        let back: Transaction = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(t, back);
    }
}
