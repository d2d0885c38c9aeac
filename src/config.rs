//! Translator configuration, loaded from `aero.toml`.
//!
//! Every field has a default, so an empty file (or no file at all) gives
//! the standard behaviour. `AERO_CC` / `AERO_CXX` override the inline
//! compilers after loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::error::Error;
use crate::ir::{AllocStrategy, OptLevel};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GenConfig {
    pub module: ModuleConfig,
    pub runtime: RuntimeConfig,
    pub inline: InlineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Appended to the input stem to name the IR module.
    pub suffix: String,
    /// 0..=5, mapped to O0 O1 O2 O3 Os Oz.
    pub opt_level: u8,
    /// Rename the user's `main` and emit a native `main(): i32` calling it.
    pub synthesize_entry: bool,
    pub user_entry: String,
    /// Run the structural verifier on the finished module.
    pub verify: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            suffix: ".vexar".to_string(),
            opt_level: 0,
            synthesize_entry: true,
            user_entry: "user_main".to_string(),
            verify: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Register heap buffers with the runtime collector.
    pub tracked_allocation: bool,
    /// Exit status of the emitted bounds-fault path.
    pub fault_exit_code: i32,
    /// Largest element count accepted for an array literal or sized array.
    pub max_array_len: u64,
    /// Call `gc_collect` before a function falls off its end.
    pub scope_cleanup: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tracked_allocation: true,
            fault_exit_code: 139,
            max_array_len: 1_000_000,
            scope_cleanup: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineConfig {
    pub c_compiler: String,
    pub cxx_compiler: String,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            c_compiler: "clang".to_string(),
            cxx_compiler: "clang++".to_string(),
        }
    }
}

impl GenConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env();
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Ok(cc) = std::env::var("AERO_CC") {
            if !cc.is_empty() {
                self.inline.c_compiler = cc;
            }
        }
        if let Ok(cxx) = std::env::var("AERO_CXX") {
            if !cxx.is_empty() {
                self.inline.cxx_compiler = cxx;
            }
        }
    }

    pub fn validate(&self) -> Result<(), Diagnostic> {
        if OptLevel::from_level(self.module.opt_level).is_none() {
            return Err(Diagnostic::error(
                format!("invalid opt_level {}", self.module.opt_level),
                Span::dummy(),
            )
            .with_help("opt_level must be between 0 and 5"));
        }
        if self.module.suffix.is_empty() {
            return Err(Diagnostic::error("module suffix must not be empty", Span::dummy()));
        }
        if self.module.user_entry.is_empty() || self.module.user_entry == "main" {
            return Err(Diagnostic::error(
                format!("invalid user entry name '{}'", self.module.user_entry),
                Span::dummy(),
            ));
        }
        Ok(())
    }

    pub fn opt_level(&self) -> OptLevel {
        OptLevel::from_level(self.module.opt_level).unwrap_or_default()
    }

    pub fn alloc_strategy(&self) -> AllocStrategy {
        if self.runtime.tracked_allocation {
            AllocStrategy::Tracked
        } else {
            AllocStrategy::Untracked
        }
    }

    /// Compiler executable for an inline language tag.
    pub fn compiler_for(&self, lang: &str) -> Option<&str> {
        match lang {
            "c" => Some(&self.inline.c_compiler),
            "cxx" | "cpp" | "c++" => Some(&self.inline.cxx_compiler),
            _ => None,
        }
    }
}
