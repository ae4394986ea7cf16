#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "VoteChain CLI".bright_cyan().bold());
    println!("{}", "-------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but the functionality lives in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!(
        "  - {}  {}",
        "votechain-server".bright_white(),
        "serve the ledger over HTTP (config.toml [api])".dimmed()
    );
    println!(
        "  - {}     {}",
        "votechain-sim".bright_white(),
        "mine simulated votes and audit the chain".dimmed()
    );
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin votechain-sim -- --voters 25 --difficulty 3".italic());
}
