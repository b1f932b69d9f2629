use anyhow::{Context, Result};
use chain_core::{KeyPair, Ledger, Sender, Transaction};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "chain-cli")]
#[command(about = "Demo driver for the signed proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a wallet keypair
    Keygen,
    /// Run an end-to-end demo: fund a wallet, sign and submit a transfer,
    /// mine it, then print balances, validity and the serialized chain
    Demo {
        /// Leading zero hex characters required of each block hash
        #[arg(long, default_value_t = 2)]
        difficulty: u32,
        /// Search nonces across threads instead of sequentially
        #[arg(long)]
        parallel: bool,
        /// Write the serialized chain to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Re-validate a serialized ledger dump
    Verify {
        /// Path to a JSON ledger dump produced by `demo --out`
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Keygen => keygen(),
        Command::Demo {
            difficulty,
            parallel,
            out,
        } => demo(difficulty, parallel, out),
        Command::Verify { file } => verify(&file),
    }
}

fn keygen() -> Result<()> {
    let keypair = KeyPair::generate();
    println!("secret:  {}", keypair.secret_hex());
    println!("address: {}", keypair.address());
    Ok(())
}

fn demo(difficulty: u32, parallel: bool, out: Option<PathBuf>) -> Result<()> {
    let miner = KeyPair::generate();
    let receiver = KeyPair::generate();
    let mut ledger = Ledger::with_difficulty(difficulty);

    // two rounds: the first seals an empty block, the second confirms the reward
    mine(&mut ledger, &miner.address(), parallel);
    mine(&mut ledger, &miner.address(), parallel);
    println!(
        "miner funded with {}",
        ledger.get_balance_of_address(&miner.address())
    );

    let mut tx = Transaction::new(Sender::Wallet(miner.address()), receiver.address(), 10);
    tx.sign(&miner)?;
    ledger.add_transaction(tx)?;
    mine(&mut ledger, &miner.address(), parallel);

    println!("blocks:           {}", ledger.chain().len());
    println!(
        "miner balance:    {}",
        ledger.get_balance_of_address(&miner.address())
    );
    println!(
        "receiver balance: {}",
        ledger.get_balance_of_address(&receiver.address())
    );
    println!("chain valid:      {}", ledger.is_chain_valid());

    let dump = serde_json::to_string_pretty(&ledger)?;
    match out {
        Some(path) => {
            fs::write(&path, dump).with_context(|| format!("writing {}", path.display()))?;
            println!("chain written to {}", path.display());
        }
        None => println!("{dump}"),
    }
    Ok(())
}

fn mine(ledger: &mut Ledger, reward_address: &str, parallel: bool) {
    if parallel {
        ledger.mine_pending_transactions_parallel(reward_address);
    } else {
        ledger.mine_pending_transactions(reward_address);
    }
}

fn verify(file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let ledger: Ledger = serde_json::from_str(&raw).context("parsing ledger dump")?;

    let valid = ledger.is_chain_valid();
    println!("blocks:      {}", ledger.chain().len());
    println!("chain valid: {valid}");
    if !valid {
        std::process::exit(1);
    }
    Ok(())
}
