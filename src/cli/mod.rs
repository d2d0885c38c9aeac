pub mod build;
pub mod check;
pub mod hash;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use aero::ast::File;
use aero::config::GenConfig;
use aero::diagnostic::render_diagnostics;
use aero::{Error, Translation};

// ─── Logging ───────────────────────────────────────────────────────

/// Plain stderr logger: `level: message`.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr(),
                "{}: {}",
                record.level().as_str().to_lowercase(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

pub fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ─── Shared helpers ────────────────────────────────────────────────

/// Config from `--config`, or `aero.toml` next to the input, or defaults.
/// An explicit `--opt-level` wins over the file.
pub fn resolve_config(config: Option<&Path>, input: &Path, opt_level: Option<u8>) -> GenConfig {
    let path = config.map(Path::to_path_buf).or_else(|| {
        let candidate = input.parent().unwrap_or(Path::new(".")).join("aero.toml");
        candidate.exists().then_some(candidate)
    });
    let mut cfg = match path {
        Some(p) => match GenConfig::load(&p) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        None => GenConfig::from_env(),
    };
    if let Some(level) = opt_level {
        cfg.module.opt_level = level;
    }
    cfg
}

pub fn load_ast_or_exit(path: &Path) -> File {
    match aero::load_ast(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// Print warnings of a successful run, or every diagnostic of a failed
/// one. Spans in a JSON AST do not come with source text, so the plain
/// form is used.
pub fn report(path: &Path, result: &Result<Translation, Error>) {
    let name = path.display().to_string();
    match result {
        Ok(t) => render_diagnostics(&t.warnings, &name, None),
        Err(Error::Translate(diags)) => render_diagnostics(diags, &name, None),
        Err(e) => eprintln!("{}: error: {}", name, e),
    }
}

/// `<stem>.ir` in `dir`, or next to the input.
pub fn output_path(input: &Path, dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let file = format!("{}.ir", stem);
    match dir {
        Some(d) => d.join(file),
        None => input.with_file_name(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("src/prog.json"), None),
            PathBuf::from("src/prog.ir")
        );
        assert_eq!(
            output_path(Path::new("src/prog.json"), Some(Path::new("out"))),
            PathBuf::from("out/prog.ir")
        );
    }
}
