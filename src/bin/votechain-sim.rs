#![forbid(unsafe_code)]
//! Simulated election: mine a batch of votes, then audit and tally the chain.

use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Instant;
use votechain::blockchain::{Block, Blockchain};
use votechain::config::{load_config, load_config_from};
use votechain::node::{init_tracing, Node};

#[derive(Parser, Debug)]
#[command(name = "votechain-sim", about = "Mine simulated votes and audit the resulting chain")]
struct Args {
    /// Number of voters casting a ballot
    #[arg(short, long, default_value_t = 10)]
    voters: usize,

    /// Proof-of-work difficulty (overrides config.toml)
    #[arg(short, long)]
    difficulty: Option<u32>,

    /// Path to a config file (defaults to ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducible choices
    #[arg(long)]
    seed: Option<u64>,

    /// Alter a recorded vote in an exported copy and show that the audit catches it
    #[arg(long)]
    tamper: bool,

    /// Maximum number of blocks to print
    #[arg(long, default_value_t = 20)]
    show: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(difficulty) = args.difficulty {
        config.ledger.difficulty = difficulty;
    }
    // keep log lines from tearing the progress bar unless asked for
    init_tracing("warn");

    let node = Node::from_config(config)?;
    let booth = &node.booth;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!(
        "{}",
        format!(
            "⛏️  Mining {} votes at difficulty {}",
            args.voters,
            node.ledger.difficulty()
        )
        .bright_cyan()
        .bold()
    );

    let progress = ProgressBar::new(args.voters as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let started = Instant::now();
    for i in 0..args.voters {
        let choice = booth
            .choices()
            .choose(&mut rng)
            .ok_or("ballot has no choices")?
            .clone();
        let block = booth.cast_vote(&format!("voter-{:04}", i + 1), &choice)?;
        progress.set_message(format!("nonce {}", block.nonce()));
        progress.inc(1);
    }
    progress.finish_with_message("done");
    println!(
        "{}",
        format!("Mined {} blocks in {:.3}s", args.voters, started.elapsed().as_secs_f64()).green()
    );
    println!();

    let blocks = node.ledger.snapshot();
    print_chain(&blocks, args.show);
    print_results(&node);

    match node.ledger.verify() {
        Ok(()) => println!("{}", "✅ Chain is valid: every hash and link checks out".green().bold()),
        Err(e) => println!("{}", format!("❌ Chain verification failed: {}", e).red().bold()),
    }

    if args.tamper {
        demonstrate_tampering(&blocks, node.ledger.difficulty())?;
    }

    Ok(())
}

fn short(hash: &str) -> String {
    if hash.len() > 16 {
        format!("{}…", &hash[..16])
    } else {
        hash.to_string()
    }
}

fn print_chain(blocks: &[Block], show: usize) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Index", "Voter", "Choice", "Nonce", "Hash", "Previous"]
                .iter()
                .map(|h| Cell::new(h).fg(TableColor::Cyan).add_attribute(Attribute::Bold)),
        );

    for block in blocks.iter().take(show) {
        let color = if block.is_genesis() { TableColor::Grey } else { TableColor::White };
        table.add_row(vec![
            Cell::new(format!("#{}", block.index())).fg(color),
            Cell::new(&block.payload().voter_id).fg(color),
            Cell::new(&block.payload().choice).fg(color),
            Cell::new(block.nonce()).fg(color),
            Cell::new(short(block.hash())).fg(TableColor::Green),
            Cell::new(short(block.previous_hash())).fg(TableColor::Grey),
        ]);
    }

    println!("{}", table);
    if blocks.len() > show {
        println!("{}", format!("… {} more blocks not shown", blocks.len() - show).dimmed());
    }
    println!();
}

fn print_results(node: &Node) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Choice", "Votes", "Share"]
                .iter()
                .map(|h| Cell::new(h).fg(TableColor::Cyan).add_attribute(Attribute::Bold)),
        );

    for row in node.booth.results_by_choice() {
        table.add_row(vec![
            Cell::new(&row.choice),
            Cell::new(row.votes),
            Cell::new(format!("{:.1}%", row.share)),
        ]);
    }

    println!("{}", table);
    if let Some((leader, votes)) = node.booth.results().leader() {
        println!("{}", format!("🏆 Leading: {} with {} votes", leader, votes).yellow().bold());
    }
    println!();
}

/// Export the chain, change one recorded choice, re-import it and audit it.
fn demonstrate_tampering(blocks: &[Block], difficulty: u32) -> Result<(), Box<dyn std::error::Error>> {
    if blocks.len() < 2 {
        println!("{}", "Nothing to tamper with: no votes were recorded".yellow());
        return Ok(());
    }

    let mut exported = serde_json::to_value(blocks)?;
    let original = exported[1]["payload"]["choice"].as_str().unwrap_or_default().to_string();
    exported[1]["payload"]["choice"] = serde_json::Value::from(format!("{} (altered)", original));

    let forged = Blockchain::from_blocks(serde_json::from_value(exported)?, difficulty)?;
    println!(
        "{}",
        format!("🔧 Changed block #1 from {:?} in an exported copy", original).magenta()
    );
    match forged.verify() {
        Ok(()) => println!("{}", "⚠️  Tampering went unnoticed".red().bold()),
        Err(e) => println!("{}", format!("🛡️  Audit caught it: {}", e).green().bold()),
    }
    Ok(())
}
