//! Chain partitioning: assigning every transaction to a chain.
//!
//! Explicit user-curated `ids` are reserved first (FINAL and IGNORE
//! chains verbatim, ACTIVE/CLOSED chains keeping their `ids` pinned);
//! everything left over is grouped automatically by instrument family
//! and inventory closure, then aligned with prior chains by shared
//! transaction ids so chain identity survives re-imports. The output
//! database is diff-minimal: input chain order preserved, user fields
//! copied verbatim, only `status` and `auto_ids` recomputed.

use crate::domain::{
    AccountId, Chain, ChainId, ChainsDb, Instrument, Transaction, TransactionId,
};
use crate::engine::inventory::MatchedLedger;
use crate::error::{ImportReport, ImportWarning};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Result of one partitioning pass.
#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    /// The new chains database, diff-minimal against the prior one.
    pub db: ChainsDb,
    /// The input transactions annotated with their chain assignment.
    pub transactions: Vec<Transaction>,
}

/// Partitions matched transactions into chains against a prior database.
pub struct ChainPartitioner<'a> {
    prior: &'a ChainsDb,
    futures_roots: &'a HashMap<String, String>,
}

impl<'a> ChainPartitioner<'a> {
    pub fn new(prior: &'a ChainsDb, futures_roots: &'a HashMap<String, String>) -> Self {
        ChainPartitioner {
            prior,
            futures_roots,
        }
    }

    /// Assign every transaction to a chain and produce the new database.
    pub fn partition(&self, ledger: &MatchedLedger, report: &mut ImportReport) -> PartitionOutcome {
        let transactions = &ledger.transactions;
        let window: HashSet<&TransactionId> =
            transactions.iter().map(|t| &t.transaction_id).collect();

        // Pass 1: reserve ids chain by chain, in database order. The
        // first claim wins. ACTIVE/CLOSED chains pin their user-curated
        // ids; FINAL/IGNORE chains are frozen whole, auto_ids included.
        let mut assignment: HashMap<TransactionId, ChainId> = HashMap::new();
        let mut reserved: HashSet<TransactionId> = HashSet::new();
        for chain in &self.prior.chains {
            let pinned: Vec<&TransactionId> = if chain.status.is_terminal() {
                chain.all_ids().collect()
            } else {
                chain.ids.iter().collect()
            };
            for id in pinned {
                if !window.contains(id) {
                    report.warn(ImportWarning::ReferenceMismatch {
                        chain_id: chain.chain_id.clone(),
                        transaction_id: id.clone(),
                    });
                    continue;
                }
                if reserved.contains(id) {
                    // Already pinned by an earlier chain; unavailable here.
                    report.warn(ImportWarning::ReferenceMismatch {
                        chain_id: chain.chain_id.clone(),
                        transaction_id: id.clone(),
                    });
                    continue;
                }
                reserved.insert(id.clone());
                assignment.insert(id.clone(), chain.chain_id.clone());
            }
        }

        // Pass 2: group the unreserved pool by (account, family) with
        // inventory-closure boundaries.
        let groups = self.build_groups(transactions, &reserved, report);

        // Pass 3: align groups with prior non-terminal chains by shared
        // transaction ids; unmatched groups mint new chains.
        let mut merged: BTreeMap<usize, Vec<TransactionId>> = BTreeMap::new();
        let mut fresh: Vec<(ChainId, Vec<TransactionId>)> = Vec::new();
        let mut used_ids: HashSet<ChainId> = self
            .prior
            .chains
            .iter()
            .map(|c| c.chain_id.clone())
            .collect();

        for group in &groups {
            let group_set: HashSet<&TransactionId> = group.ids.iter().collect();
            let matched = self.prior.chains.iter().enumerate().find(|(_, chain)| {
                !chain.status.is_terminal()
                    && chain.all_ids().any(|id| group_set.contains(id))
            });
            match matched {
                Some((position, chain)) => {
                    for id in &group.ids {
                        assignment.insert(id.clone(), chain.chain_id.clone());
                    }
                    merged.entry(position).or_default().extend(group.ids.clone());
                }
                None => {
                    let chain_id = self.mint_chain_id(group, &mut used_ids, &mut merged);
                    match chain_id {
                        MintOutcome::Merged(existing) => {
                            for id in &group.ids {
                                assignment.insert(id.clone(), existing.clone());
                            }
                        }
                        MintOutcome::New(chain_id) => {
                            for id in &group.ids {
                                assignment.insert(id.clone(), chain_id.clone());
                            }
                            fresh.push((chain_id, group.ids.clone()));
                        }
                    }
                }
            }
        }

        // Pass 4: emit the new database; prior order first, new chains
        // appended in first-transaction order.
        let stream_position: HashMap<&TransactionId, usize> = transactions
            .iter()
            .enumerate()
            .map(|(i, t)| (&t.transaction_id, i))
            .collect();
        let mut db = ChainsDb::new();
        for (position, chain) in self.prior.chains.iter().enumerate() {
            if chain.status.is_terminal() {
                // Copied through verbatim, auto_ids included.
                db.chains.push(chain.clone());
                continue;
            }
            let mut updated = chain.clone();
            updated.auto_ids = merged.remove(&position).unwrap_or_default();
            updated
                .auto_ids
                .sort_by_key(|id| stream_position.get(id).copied().unwrap_or(usize::MAX));
            db.chains.push(updated);
        }
        for (chain_id, auto_ids) in fresh {
            let mut chain = Chain::new(chain_id);
            chain.auto_ids = auto_ids;
            db.chains.push(chain);
        }

        // Annotate the stream. Orphans keep chain_id = None; they were
        // already reported when grouping failed.
        let mut annotated = transactions.clone();
        for txn in &mut annotated {
            txn.chain_id = assignment.get(&txn.transaction_id).cloned();
        }

        tracing::debug!(
            chains = db.len(),
            groups = groups.len(),
            "chain partitioning complete"
        );
        PartitionOutcome {
            db,
            transactions: annotated,
        }
    }

    /// Group unreserved transactions per (account, instrument family),
    /// splitting whenever the family's inventory returns to zero.
    fn build_groups(
        &self,
        transactions: &[Transaction],
        reserved: &HashSet<TransactionId>,
        report: &mut ImportReport,
    ) -> Vec<TxnGroup> {
        let mut buckets: BTreeMap<(AccountId, String), Vec<&Transaction>> = BTreeMap::new();
        for txn in transactions {
            if reserved.contains(&txn.transaction_id) {
                continue;
            }
            let family = match Instrument::parse(&txn.symbol) {
                Ok(inst) => inst.family_key(self.futures_roots),
                Err(err) => {
                    report.warn(ImportWarning::OrphanTransaction {
                        transaction_id: txn.transaction_id.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            buckets
                .entry((txn.account.clone(), family))
                .or_default()
                .push(txn);
        }

        let mut groups = Vec::new();
        for ((_, family), txns) in buckets {
            let mut nets: BTreeMap<&str, crate::domain::Decimal> = BTreeMap::new();
            let mut current = TxnGroup::default();
            for txn in txns {
                if current.ids.is_empty() {
                    current.first = Some(FirstTxn::of(txn, family.clone()));
                }
                current.ids.push(txn.transaction_id.clone());
                let net = nets
                    .entry(txn.symbol.as_str())
                    .or_insert_with(crate::domain::Decimal::zero);
                *net = *net + txn.signed_quantity();
                if nets.values().all(|q| q.is_zero()) {
                    groups.push(std::mem::take(&mut current));
                    nets.clear();
                }
            }
            if !current.ids.is_empty() {
                groups.push(current);
            }
        }
        // Deterministic output order: by first transaction in the stream.
        groups.sort_by(|a, b| a.first.cmp(&b.first));
        groups
    }

    /// Mint a deterministic chain id for a new group. If the minted id
    /// already belongs to a prior non-terminal chain, the group is the
    /// same chain rediscovered and merges into it; otherwise collisions
    /// get a numeric suffix.
    fn mint_chain_id(
        &self,
        group: &TxnGroup,
        used_ids: &mut HashSet<ChainId>,
        merged: &mut BTreeMap<usize, Vec<TransactionId>>,
    ) -> MintOutcome {
        let first = group.first.as_ref().expect("group is never empty");
        let base = format!(
            "{}.{}.{}",
            first.account.as_str(),
            first.datetime.format("%y%m%d_%H%M%S"),
            first.family
        );
        let minted = ChainId::new(base.clone());

        if let Some((position, chain)) = self
            .prior
            .chains
            .iter()
            .enumerate()
            .find(|(_, c)| c.chain_id == minted)
        {
            if !chain.status.is_terminal() {
                merged
                    .entry(position)
                    .or_default()
                    .extend(group.ids.clone());
                return MintOutcome::Merged(chain.chain_id.clone());
            }
        }

        let mut candidate = minted;
        let mut suffix = 2;
        while used_ids.contains(&candidate) {
            candidate = ChainId::new(format!("{}-{}", base, suffix));
            suffix += 1;
        }
        used_ids.insert(candidate.clone());
        MintOutcome::New(candidate)
    }
}

enum MintOutcome {
    /// The minted id named an existing non-terminal chain; merged into it.
    Merged(ChainId),
    New(ChainId),
}

/// Ordering handle for a group's first transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FirstTxn {
    datetime: chrono::NaiveDateTime,
    account: AccountId,
    transaction_id: TransactionId,
    family: String,
}

impl FirstTxn {
    fn of(txn: &Transaction, family: String) -> Self {
        FirstTxn {
            datetime: txn.datetime,
            account: txn.account.clone(),
            transaction_id: txn.transaction_id.clone(),
            family,
        }
    }
}

/// One automatically discovered group of transactions.
#[derive(Debug, Clone, Default)]
struct TxnGroup {
    first: Option<FirstTxn>,
    ids: Vec<TransactionId>,
}
