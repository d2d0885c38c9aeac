use std::path::PathBuf;
use std::process;

use clap::Args;
use rayon::prelude::*;

use aero::BuiltinTable;

use super::{output_path, report, resolve_config};

#[derive(Args)]
pub struct BuildArgs {
    /// AST files (JSON) to translate
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output directory (default: next to each input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Translator config (default: aero.toml next to the input)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Optimisation level recorded on the module (0-5)
    #[arg(long)]
    pub opt_level: Option<u8>,
}

/// Translate every input; each file is lowered on its own rayon task.
pub fn cmd_build(args: BuildArgs) {
    let BuildArgs {
        inputs,
        output,
        config,
        opt_level,
    } = args;
    if let Some(dir) = &output {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: cannot create '{}': {}", dir.display(), e);
            process::exit(1);
        }
    }

    let builtins = BuiltinTable::standard();
    let failures: usize = inputs
        .par_iter()
        .map(|input| {
            let cfg = resolve_config(config.as_deref(), input, opt_level);
            let result = aero::load_ast(input)
                .and_then(|file| aero::translate_with_builtins(&file, &cfg, &builtins));
            report(input, &result);
            let Ok(translation) = result else {
                return 1;
            };
            let out = output_path(input, output.as_deref());
            match std::fs::write(&out, translation.module.to_string()) {
                Ok(()) => {
                    eprintln!("Wrote {}", out.display());
                    0
                }
                Err(e) => {
                    eprintln!("error: cannot write '{}': {}", out.display(), e);
                    1
                }
            }
        })
        .sum();

    if failures > 0 {
        eprintln!("{} of {} file(s) failed", failures, inputs.len());
        process::exit(1);
    }
}
