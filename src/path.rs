//! Path and URL string utilities for tenant-resolver

use std::path::Path;

use glob::Pattern;
use regex::Regex;

use crate::error::Result;

/// Make a version usable as a directory name component.
pub fn escape_version(version: &str) -> String {
    version.replace('/', "_")
}

/// Compiled set of glob patterns used to skip archive entries.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if `path`, or any of its ancestors, matches a pattern.
    pub fn excludes(&self, path: &Path) -> bool {
        if self.is_empty() {
            return false;
        }
        path.ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.patterns.iter().any(|pattern| pattern.matches_path(p)))
    }
}

/// Expand `{{.Name}}` and `{{.Version}}` placeholders in a package URL.
pub fn expand_url_template(url: &str, name: &str, version: &str) -> String {
    // Pattern is a literal; compilation cannot fail.
    let Ok(placeholder) = Regex::new(r"\{\{\s*\.(Name|Version)\s*\}\}") else {
        return url.to_string();
    };
    placeholder
        .replace_all(url, |caps: &regex::Captures<'_>| match &caps[1] {
            "Name" => name.to_string(),
            _ => version.to_string(),
        })
        .into_owned()
}
