//! Aero translation core: a typed Aero AST in, a basic-block IR module out.
//!
//! The front end hands over a finished `ast::File` (the CLI reads it as
//! JSON). `codegen::CodeGen` lowers it through `ir::IrBuilder`; the result
//! is verified and handed to a downstream stage that is not part of this
//! crate.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod hash;
pub mod ir;
pub mod span;

use std::path::Path;

pub use codegen::{BuiltinTable, CodeGen, GenOutput};
pub use config::GenConfig;
pub use diagnostic::Diagnostic;
pub use error::Error;
pub use ir::Module;

use diagnostic::has_errors;

/// A successful translation: the verified module plus any warnings.
#[derive(Debug)]
pub struct Translation {
    pub module: Module,
    pub warnings: Vec<Diagnostic>,
}

/// Translate with the default configuration.
pub fn translate(file: &ast::File) -> Result<Translation, Error> {
    translate_with_config(file, &GenConfig::default())
}

pub fn translate_with_config(file: &ast::File, config: &GenConfig) -> Result<Translation, Error> {
    let builtins = BuiltinTable::standard();
    translate_with_builtins(file, config, &builtins)
}

/// Translate against a caller-supplied builtin table, so batch drivers
/// build it once.
pub fn translate_with_builtins(
    file: &ast::File,
    config: &GenConfig,
    builtins: &BuiltinTable,
) -> Result<Translation, Error> {
    config
        .validate()
        .map_err(|diag| Error::Translate(vec![diag]))?;

    let name = module_name(&file.name, &config.module.suffix);
    let output = CodeGen::new(&name, builtins)
        .with_config(config.clone())
        .build_file(file);

    if has_errors(&output.diagnostics) {
        return Err(Error::Translate(output.diagnostics));
    }
    if config.module.verify {
        ir::verify::verify_module(&output.module).map_err(Error::Verify)?;
    }
    log::debug!(
        "translated {} ({} functions, {} warnings)",
        name,
        output.module.functions.len(),
        output.diagnostics.len()
    );
    Ok(Translation {
        module: output.module,
        warnings: output.diagnostics,
    })
}

/// `<stem of file_name><suffix>`, e.g. `hello.aero` → `hello.vexar`.
pub fn module_name(file_name: &str, suffix: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("module");
    format!("{}{}", stem, suffix)
}

/// Parse a serialized AST.
pub fn parse_ast(json: &str) -> Result<ast::File, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read a serialized AST from disk. A file without a `name` is named
/// after the path.
pub fn load_ast(path: &Path) -> Result<ast::File, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut file = parse_ast(&content).map_err(|source| Error::Ast {
        path: path.to_path_buf(),
        source,
    })?;
    if file.name.is_empty() {
        file.name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    Ok(file)
}

/// Load and translate one AST file.
pub fn compile_file(path: &Path, config: &GenConfig) -> Result<Translation, Error> {
    let file = load_ast(path)?;
    translate_with_config(&file, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_uses_stem_and_suffix() {
        assert_eq!(module_name("hello.aero", ".vexar"), "hello.vexar");
        assert_eq!(module_name("dir/prog.json", ".ll"), "prog.ll");
        assert_eq!(module_name("", ".vexar"), "module.vexar");
    }

    #[test]
    fn test_invalid_config_is_rejected_before_translation() {
        let mut config = GenConfig::default();
        config.module.opt_level = 9;
        let file = ast::File {
            name: "x.aero".into(),
            items: vec![],
        };
        let err = translate_with_config(&file, &config).unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
    }
}
