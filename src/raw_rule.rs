//! Optional side file of extra raw mode substitutions.
//!
//! ```yaml
//! replace:
//!   'Version=\d+(\.\d+)*': 'Version=x'
//!   '<Stamp>[^<]*</Stamp>': '<Stamp/>'
//! ```
//!
//! Entries are regular expressions mapped to replacement templates, applied in file order.

use crate::err::{ConfigError, ConfigResult};
use crate::pipeline::Pipeline;

use indexmap::IndexMap;
use log::info;
use serde::Deserialize;
use std::io;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct RawRuleFile {
    #[serde(default, alias = "Replace")]
    replace: IndexMap<String, String>,
}

/// Compiles raw-rule YAML `source` into body-fix steps. `path` is only used for error reporting.
pub fn parse_raw_rules(source: &str, path: &Path) -> ConfigResult<Pipeline> {
    if source.trim().is_empty() {
        return Ok(Pipeline::new());
    }

    let file: RawRuleFile =
        serde_yaml::from_str(source).map_err(|source| ConfigError::MalformedRawRule {
            path: path.to_path_buf(),
            source,
        })?;

    let mut pipeline = Pipeline::new();
    for (pattern, replacement) in file.replace {
        pipeline = pipeline
            .regex_replace_all(&pattern, replacement)
            .map_err(|source| ConfigError::InvalidRawRulePattern {
                path: path.to_path_buf(),
                pattern: pattern.clone(),
                source,
            })?;
    }

    Ok(pipeline)
}

/// Reads the raw-rule file at `path`, `None` when there is no such file.
pub fn load_raw_rules(path: impl AsRef<Path>) -> ConfigResult<Option<Pipeline>> {
    let path = path.as_ref();

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("no raw-rule file at {}, skipping", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::RawRuleIo {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let pipeline = parse_raw_rules(&source, path)?;
    info!("loaded {} raw rules from {}", pipeline.len(), path.display());

    Ok(Some(pipeline))
}
