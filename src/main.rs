use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use std::path::PathBuf;

use pow_ledger::blockchain::MineOutcome;
use pow_ledger::{Ledger, LedgerConfig};

/// Seeds a ledger with sample transfers, mines them and prints the result
#[derive(Debug, Parser)]
#[command(name = "pow-ledger", version)]
struct Args {
    /// JSON config file with `difficulty`, `mining_reward` and `budget`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured difficulty
    #[arg(short, long)]
    difficulty: Option<usize>,
}

fn load_config(args: &Args) -> anyhow::Result<LedgerConfig> {
    let mut config = match &args.config {
        Some(path) => LedgerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LedgerConfig::default(),
    };

    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
        config.validate()?;
    }

    Ok(config)
}

// Seal the pending queue, honouring the configured budget if there is one
fn mine(ledger: &mut Ledger, config: &LedgerConfig, beneficiary: &str) -> anyhow::Result<()> {
    let outcome = if config.budget.is_unbounded() {
        ledger.mine_pending_transactions(beneficiary)?
    } else {
        ledger.mine_pending_transactions_within(beneficiary, &config.budget, None)?
    };

    match outcome {
        MineOutcome::Sealed(block) => info!("Sealed block {} for {}", block.index, beneficiary),
        MineOutcome::NoPendingWork => info!("Nothing to mine"),
        MineOutcome::BudgetExhausted { attempts } => {
            warn!("No block found within budget ({} attempts)", attempts)
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    let config = load_config(&args)?;
    let mut ledger = Ledger::with_config(&config);

    ledger.add_transaction("alice", "bob", 10.0)?;
    ledger.add_transaction("bob", "charlie", 2.0)?;
    mine(&mut ledger, &config, "miner1")?;

    ledger.add_transaction("charlie", "alice", 1.0)?;
    mine(&mut ledger, &config, "miner1")?;

    for block in ledger.iter() {
        println!("{}", block);
    }

    println!("Balances:");
    for name in ["alice", "bob", "charlie", "miner1"] {
        println!("{} {}", name, ledger.get_balance_of_address(name));
    }

    match ledger.validate() {
        Ok(()) => println!("Valid: true"),
        Err(err) => println!("Valid: false ({})", err),
    }

    Ok(())
}
