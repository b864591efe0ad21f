//! Stable transaction ordering for deterministic processing.

use crate::domain::Transaction;

/// Stable ordering key for transactions.
///
/// The full pipeline precondition: transactions sorted by
/// (datetime, account, transaction_id). Automatic grouping and closure
/// detection depend on this monotonic ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TxnOrderingKey {
    pub datetime: chrono::NaiveDateTime,
    pub account: String,
    pub transaction_id: String,
}

impl TxnOrderingKey {
    /// Create an ordering key from a Transaction.
    pub fn from_transaction(txn: &Transaction) -> Self {
        TxnOrderingKey {
            datetime: txn.datetime,
            account: txn.account.as_str().to_string(),
            transaction_id: txn.transaction_id.as_str().to_string(),
        }
    }
}

/// Sort transactions into the canonical pipeline order.
pub fn sort_transactions(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        TxnOrderingKey::from_transaction(a).cmp(&TxnOrderingKey::from_transaction(b))
    });
}
