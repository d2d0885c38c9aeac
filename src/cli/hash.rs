use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{load_ast_or_exit, report, resolve_config};

#[derive(Args)]
pub struct HashArgs {
    /// AST file (JSON)
    pub input: PathBuf,
    /// Print full 64-character hashes
    #[arg(long)]
    pub full: bool,
    /// Translator config (default: aero.toml next to the input)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn cmd_hash(args: HashArgs) {
    let HashArgs {
        input,
        full,
        config,
    } = args;
    let cfg = resolve_config(config.as_deref(), &input, None);
    let file = load_ast_or_exit(&input);

    let result = aero::translate_with_config(&file, &cfg);
    report(&input, &result);
    let Ok(translation) = result else {
        process::exit(1);
    };

    let show = |h: aero::hash::ContentHash| if full { h.to_hex() } else { h.to_string() };
    let module_hash = aero::hash::hash_module(&translation.module);
    eprintln!("Module: {} {}", show(module_hash), translation.module.name);
    for (name, hash) in aero::hash::hash_functions(&translation.module) {
        println!("  {} {}", show(hash), name);
    }
}
