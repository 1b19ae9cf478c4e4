pub mod types;

pub use types::PackageSpec;

use regex::{NoExpand, RegexBuilder};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Invalid package spec {0:?}: expected name@version")]
    EmptyName(String),

    #[error("Failed to build pattern for package: {0}")]
    Pattern(#[from] regex::Error),
}

/// Rewrite the version of each requested package in a manifest's text.
///
/// For each spec, in order, the first case-insensitive occurrence of
/// `"<name>": "<value>"` is replaced with `"<name>": "<version>"`. Each
/// replacement sees the output of the previous one. Packages that do not
/// appear are skipped. The text is never parsed as JSON.
#[instrument(skip_all, fields(packages = specs.len(), bytes = text.len()))]
pub fn update_packages(specs: &[PackageSpec], text: &str) -> Result<String, PackageError> {
    let mut updated = text.to_string();

    for spec in specs {
        let pattern = RegexBuilder::new(&format!(
            r#""{}": "[^"\n]+""#,
            regex::escape(&spec.name)
        ))
        .case_insensitive(true)
        .build()?;

        if !pattern.is_match(&updated) {
            debug!(package = %spec.name, "package not found, skipping");
            continue;
        }

        let replacement = format!(r#""{}": "{}""#, spec.name, spec.version);
        updated = pattern
            .replacen(&updated, 1, NoExpand(&replacement))
            .into_owned();
        debug!(package = %spec.name, version = %spec.version, "package updated");
    }

    Ok(updated)
}
