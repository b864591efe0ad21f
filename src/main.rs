use anyhow::Context;
use chainkeeper::source::SourceRegistry;
use chainkeeper::{run_import, Config};
use std::path::Path;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("import failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Config path: first CLI argument, falling back to the environment.
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::from_env()?,
    };
    let force = std::env::var("CHAINKEEPER_FORCE").is_ok();

    let registry = SourceRegistry::with_defaults();
    let result = run_import(&config, &registry, force).context("import run aborted")?;

    if !result.report.is_clean() {
        eprintln!("{} warning(s):", result.report.len());
        for warning in &result.report.warnings {
            eprintln!("  {}", warning);
        }
    }
    println!(
        "imported {} transactions into {} chains ({} marks)",
        result.transactions.len(),
        result.db.len(),
        result.marks.len()
    );
    Ok(())
}
