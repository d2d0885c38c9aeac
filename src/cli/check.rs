use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{load_ast_or_exit, report, resolve_config};

#[derive(Args)]
pub struct CheckArgs {
    /// AST file (JSON)
    pub input: PathBuf,
    /// Translator config (default: aero.toml next to the input)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn cmd_check(args: CheckArgs) {
    let CheckArgs { input, config } = args;
    let mut cfg = resolve_config(config.as_deref(), &input, None);
    cfg.module.verify = true;
    let file = load_ast_or_exit(&input);

    let result = aero::translate_with_config(&file, &cfg);
    report(&input, &result);
    match result {
        Ok(_) => eprintln!("OK: {}", input.display()),
        Err(_) => process::exit(1),
    }
}
