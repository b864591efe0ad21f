//! The single-pass batch import pipeline.
//!
//! Stages run in a fixed order, each consuming the complete output of
//! the previous one: sources → InventoryMatcher → ChainPartitioner →
//! ChainStatusResolver → TargetCalculator → MarkEngine → artifacts.
//! Every fatal check happens before the first byte of output is
//! written, so a failed run leaves prior outputs untouched.

use crate::config::Config;
use crate::db::{load_chains_db, store_chains_db};
use crate::domain::{ChainsDb, Transaction, TransactionId};
use crate::engine::{
    ChainPartitioner, ChainStatusResolver, InitialPosition, InventoryMatcher, MarkEngine,
    PriceMap, TargetCalculator,
};
use crate::error::{ImportError, ImportReport};
use crate::source::{read_initial_positions, read_price_csv, SourceRegistry};
use std::collections::HashSet;

pub mod artifacts;

pub use artifacts::ChainSummaryRow;

/// Everything one import run produced.
#[derive(Debug, Clone)]
pub struct ImportResult {
    /// Matched, chain-annotated transactions.
    pub transactions: Vec<Transaction>,
    /// Synthetic valuation rows for open inventory.
    pub marks: Vec<Transaction>,
    /// The new chains database, already written to disk.
    pub db: ChainsDb,
    /// One-row-per-chain aggregation.
    pub summary: Vec<ChainSummaryRow>,
    /// Non-fatal warnings collected along the way.
    pub report: ImportReport,
}

/// Run a full import using the price file named in the configuration
/// (valued as of now), if any.
pub fn run_import(
    config: &Config,
    registry: &SourceRegistry,
    force: bool,
) -> Result<ImportResult, ImportError> {
    let prices = match &config.prices {
        Some(path) => Some(PriceMap::from_pairs(
            read_price_csv(path)?,
            chrono::Local::now().naive_local(),
        )),
        None => None,
    };
    run_import_with(config, registry, prices, force)
}

/// Run a full import with an explicitly supplied price map.
pub fn run_import_with(
    config: &Config,
    registry: &SourceRegistry,
    prices: Option<PriceMap>,
    force: bool,
) -> Result<ImportResult, ImportError> {
    let mut report = ImportReport::new();

    let prior = load_chains_db(&config.chains_db)?;
    tracing::info!(chains = prior.len(), "loaded prior chains database");

    // Fetch and normalize every account's export.
    let mut transactions = Vec::new();
    let mut initial_positions: Vec<InitialPosition> = Vec::new();
    for account_cfg in &config.accounts {
        let account = crate::domain::AccountId::new(account_cfg.nickname.clone());
        let source = registry.get(&account_cfg.module)?;
        let fetched = source.fetch(&account, &account_cfg.path)?;
        tracing::info!(
            account = %account,
            source = source.tag(),
            transactions = fetched.len(),
            "fetched account export"
        );
        transactions.extend(fetched);
        if let Some(positions_path) = &account_cfg.initial_positions {
            initial_positions.extend(read_initial_positions(&account, positions_path)?);
        }
    }

    // Match, partition, resolve: all fatal validation happens here,
    // before anything is written.
    let matcher = InventoryMatcher::new(force);
    let ledger = matcher.match_transactions(transactions, &initial_positions, &mut report)?;

    let partitioner = ChainPartitioner::new(&prior, &config.settings.futures_roots);
    let mut outcome = partitioner.partition(&ledger, &mut report);

    ChainStatusResolver::resolve(&mut outcome.db, &outcome.transactions)?;

    // Targets and the chains summary.
    let calculator = TargetCalculator::new(config.settings.win_target_default);
    let summary = build_summary(&outcome.db, &outcome.transactions, config, &calculator, &mut report);

    // Marks value the open inventory left by the matcher.
    let marks = match &prices {
        Some(prices) => MarkEngine::new(&config.settings.futures_multipliers).mark_positions(
            &ledger.book,
            &outcome.transactions,
            prices,
            &mut report,
        ),
        None => Vec::new(),
    };

    // Output phase: atomic database replace, then the tabular artifacts.
    std::fs::create_dir_all(&config.output_dir)?;
    store_chains_db(&config.chains_db, &outcome.db)?;
    artifacts::write_transactions_csv(
        &config.output_dir.join("transactions.csv"),
        &outcome.transactions,
        &marks,
    )?;
    artifacts::write_chains_csv(&config.output_dir.join("chains.csv"), &summary)?;

    tracing::info!(
        transactions = outcome.transactions.len(),
        marks = marks.len(),
        chains = outcome.db.len(),
        warnings = report.len(),
        "import complete"
    );
    Ok(ImportResult {
        transactions: outcome.transactions,
        marks,
        db: outcome.db,
        summary,
        report,
    })
}

fn build_summary(
    db: &ChainsDb,
    transactions: &[Transaction],
    config: &Config,
    calculator: &TargetCalculator,
    report: &mut ImportReport,
) -> Vec<ChainSummaryRow> {
    let excluded: HashSet<&str> = config
        .settings
        .group_exclusions
        .iter()
        .map(|s| s.as_str())
        .collect();

    db.chains
        .iter()
        .filter(|chain| {
            chain
                .group
                .as_deref()
                .map_or(true, |group| !excluded.contains(group))
        })
        .map(|chain| {
            let ids: HashSet<&TransactionId> = chain.all_ids().collect();
            let window_txns: Vec<&Transaction> = transactions
                .iter()
                .filter(|t| ids.contains(&t.transaction_id))
                .collect();
            let net_credit = TargetCalculator::net_credit(chain, transactions);
            let targets = calculator.compute(chain, net_credit, report);
            let asset_class = window_txns
                .first()
                .and_then(|t| crate::domain::Instrument::parse(&t.symbol).ok())
                .and_then(|inst| {
                    config
                        .settings
                        .asset_classes
                        .get(&inst.underlying)
                        .map(|s| s.as_str())
                });
            ChainSummaryRow::build(
                chain,
                &window_txns,
                asset_class,
                net_credit,
                targets.pnl_win,
                targets.pnl_loss,
            )
        })
        .collect()
}
