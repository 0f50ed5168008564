use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use pow_ledger::api;
use pow_ledger::{Address, Amount, Blockchain, LedgerConfig, Transaction};

#[derive(Parser, Debug)]
#[command(name = "pow_ledger")]
#[command(about = "An educational proof-of-work ledger")]
struct Cli {
    /// TOML config file; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through transactions, mining, balances and tamper detection
    Demo,
    /// Serve the ledger over HTTP
    Serve,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LedgerConfig> {
    match path {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(LedgerConfig::default()),
    }
}

fn print_balances(blockchain: &Blockchain, names: &[&str]) {
    for name in names {
        println!(
            "  {:<8} {}",
            format!("{}:", name),
            blockchain.get_balance(&Address::from(*name))
        );
    }
}

fn print_chain(blockchain: &Blockchain) {
    println!("\n{}", "=".repeat(60));
    println!("BLOCKCHAIN CONTENTS");
    println!("{}", "=".repeat(60));

    for block in blockchain.get_chain() {
        println!("\nBlock {}", block.index);
        println!("  Hash:          {}", block.hash);
        println!("  Previous Hash: {}", block.previous_hash);
        println!(
            "  Timestamp:     {}",
            block.created_at.format("%Y-%m-%d %H:%M:%S%.3f")
        );
        println!("  Nonce:         {}", block.nonce);
        println!("  Transactions:  {}", block.transactions.len());

        for (position, record) in block.transactions.iter().enumerate() {
            let sender = record
                .sender
                .as_ref()
                .map_or_else(|| "None".to_string(), Address::to_string);
            println!(
                "    {}. {} -> {}: {}",
                position + 1,
                sender,
                record.recipient,
                record.amount
            );
        }
    }

    println!("{}\n", "=".repeat(60));
}

fn submit(blockchain: &Blockchain, from: &str, to: &str, coins: u64) {
    let transaction = Transaction::new(
        Some(Address::from(from)),
        Address::from(to),
        Amount::coins(coins),
    );

    if let Err(err) = blockchain.submit_transaction(transaction) {
        println!("  {} -> {} ({}) rejected: {}", from, to, coins, err);
    }
}

fn run_demo(config: &LedgerConfig) -> anyhow::Result<()> {
    let blockchain = Blockchain::with_config(&config.chain);
    info!("Initial blockchain info: {:?}", blockchain.chain_info());

    println!("\nCreating transactions...");
    submit(&blockchain, "Alice", "Bob", 50);
    submit(&blockchain, "Bob", "Charlie", 25);
    submit(&blockchain, "Charlie", "Alice", 10);

    println!("\nMining block 1...");
    blockchain.mine_pending_transactions(&Address::from("Miner1"))?;

    println!("\nBalances after mining block 1:");
    print_balances(&blockchain, &["Alice", "Bob", "Charlie", "Miner1"]);

    println!("\nMiner1 pays Alice, then Alice pays Bob...");
    submit(&blockchain, "Miner1", "Alice", 40);
    blockchain.mine_pending_transactions(&Address::from("Miner2"))?;
    submit(&blockchain, "Alice", "Bob", 20);

    println!("\nMining block 3...");
    blockchain.mine_pending_transactions(&Address::from("Miner2"))?;

    println!("\nFinal balances:");
    print_balances(&blockchain, &["Alice", "Bob", "Charlie", "Miner1", "Miner2"]);

    print_chain(&blockchain);
    println!("Blockchain valid: {}", blockchain.is_chain_valid());

    println!("\nAttempting to tamper with block 1...");
    warn!("Tampering is for demonstration only; a networked chain would reject the altered block");
    blockchain.tamper_block(1, |block| {
        if let Some(record) = block.transactions.first_mut() {
            record.amount = Amount::coins(999_999);
        }
    });
    match blockchain.validate() {
        Ok(()) => println!("Blockchain valid after tampering: true"),
        Err(err) => println!("Blockchain valid after tampering: false ({})", err),
    }

    println!(
        "\nFinal blockchain info: {}",
        serde_json::to_string_pretty(&blockchain.chain_info())?
    );
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Demo => run_demo(&config)?,
        Command::Serve => {
            let blockchain = Blockchain::with_config(&config.chain);
            let (host, port) = config.bind_address();
            api::run_server(blockchain, host, port)
                .await
                .context("running HTTP server")?;
        }
    }

    Ok(())
}
