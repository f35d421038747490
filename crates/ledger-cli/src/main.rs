use std::collections::BTreeMap;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ledger_core::{Block, Ledger, LedgerConfig, MineOutcome, MiningControl, Transaction};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const ALICE: &str = "wallet-Alice";
const BLOCK: &str = "wallet-Block";
const CHARLIE: &str = "wallet-Charlie";
const MINER: &str = "miner49r-wallet";

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Drive an in-memory proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Airdrop, mine, transfer and mine again, printing balances after each round
    Demo {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Print the final chain and balances as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mine a single block and report the nonce search
    HashDemo {
        /// Leading zero hex digits required
        #[arg(long, default_value_t = 4)]
        difficulty: u32,
        /// Recipient of the minted transaction in the block
        #[arg(long, default_value = MINER)]
        payee: String,
        #[arg(long, default_value_t = 50)]
        amount: u64,
    },
}

#[derive(Args, Debug)]
struct LedgerArgs {
    /// Leading zero hex digits a block hash must carry
    #[arg(long, default_value_t = ledger_core::constants::DEFAULT_DIFFICULTY)]
    difficulty: u32,
    /// Amount minted to the miner per block
    #[arg(long, default_value_t = ledger_core::constants::DEFAULT_MINING_REWARD)]
    reward: u64,
    /// Give up on a block after this many nonce attempts
    #[arg(long)]
    max_attempts: Option<u64>,
}

impl LedgerArgs {
    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            mining_reward: self.reward,
            max_mining_attempts: self.max_attempts,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    valid: bool,
    balances: BTreeMap<&'a str, i128>,
    chain: &'a [Block],
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo { ledger, json } => run_demo(ledger.config(), json),
        Command::HashDemo {
            difficulty,
            payee,
            amount,
        } => run_hash_demo(difficulty, payee, amount),
    }
}

fn run_demo(config: LedgerConfig, json: bool) -> Result<()> {
    let mut ledger = Ledger::new(config)?;

    for result in ledger.airdrop_to_addresses([ALICE, BLOCK, CHARLIE, MINER], 100) {
        if let Err(err) = result {
            println!("airdrop rejected: {err}");
        }
    }
    mine(&mut ledger)?;
    print_balances(&ledger);

    for tx in [
        Transaction::transfer(ALICE, BLOCK, 50),
        Transaction::transfer(BLOCK, ALICE, 25),
    ] {
        if let Err(err) = ledger.create_transaction(tx) {
            println!("transaction rejected: {err}");
        }
    }
    println!("Starting mining...");
    mine(&mut ledger)?;
    print_balances(&ledger);
    println!("Chain valid: {}", ledger.is_chain_valid());

    if json {
        let report = Report {
            valid: ledger.is_chain_valid(),
            balances: ledger
                .addresses()
                .into_iter()
                .map(|address| (address, ledger.balance_of(address)))
                .collect(),
            chain: ledger.chain(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn mine(ledger: &mut Ledger) -> Result<()> {
    match ledger.mine_pending_transactions(MINER)? {
        MineOutcome::NothingToMine { .. } => println!("No transactions to mine."),
        MineOutcome::Mined(mined) => {
            println!("Block successfully mined: #{} {}", mined.index, mined.hash);
            for tx in &mined.dropped {
                println!(
                    "dropped: {} -> {} ({})",
                    tx.payer.as_deref().unwrap_or("-"),
                    tx.payee.as_deref().unwrap_or("-"),
                    tx.amount
                );
            }
        }
    }
    Ok(())
}

fn print_balances(ledger: &Ledger) {
    for address in [ALICE, BLOCK, MINER] {
        println!("Balance of {address}: {}", ledger.balance_of(address));
    }
}

fn run_hash_demo(difficulty: u32, payee: String, amount: u64) -> Result<()> {
    let genesis = Ledger::create_genesis_block();
    let mut block = Block::new(
        ledger_core::now_millis(),
        vec![Transaction::minted(payee, amount)],
        genesis.hash(),
    );
    println!("initial hash: {}", block.hash());
    let report = block.mine(difficulty, &MiningControl::unbounded())?;
    info!(attempts = report.attempts, "search finished");
    println!("nonce:    {}", report.nonce);
    println!("hash:     {}", report.hash);
    println!("attempts: {}", report.attempts);
    println!(
        "rate:     {:.0} H/s",
        report.attempts as f64 / report.elapsed.as_secs_f64().max(1e-6)
    );
    Ok(())
}
