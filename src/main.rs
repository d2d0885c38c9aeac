use clap::{Parser, Subcommand};

mod cli;

use cli::build::{cmd_build, BuildArgs};
use cli::check::{cmd_check, CheckArgs};
use cli::hash::{cmd_hash, HashArgs};

#[derive(Parser)]
#[command(
    name = "aero",
    version,
    about = "Aero translator: typed AST in, basic-block IR out"
)]
struct Cli {
    /// More output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate AST files and write their IR
    Build(BuildArgs),
    /// Translate and verify without writing anything
    Check(CheckArgs),
    /// Print content hashes of the translated module and its functions
    Hash(HashArgs),
}

fn main() {
    let cli = Cli::parse();
    cli::init_logger(cli.verbose);

    match cli.command {
        Command::Build(args) => cmd_build(args),
        Command::Check(args) => cmd_check(args),
        Command::Hash(args) => cmd_hash(args),
    }
}
