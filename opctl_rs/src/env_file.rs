//! Local environment overlay files (`.env`, `.env.<environment>`).

use std::io;
use std::path::{Path, PathBuf};

/// Variables read from one overlay file, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverlay {
    pub path: PathBuf,
    pub vars: Vec<(String, String)>,
}

/// Overlay file name for the selected environment.
pub fn overlay_file_name(environment: Option<&str>) -> String {
    match environment {
        Some(name) if !name.is_empty() => format!(".env.{name}"),
        _ => ".env".to_string(),
    }
}

/// Load the overlay for `environment` from `dir`. A missing file is not an error.
pub fn load(dir: &Path, environment: Option<&str>) -> io::Result<Option<EnvOverlay>> {
    let path = dir.join(overlay_file_name(environment));
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(Some(EnvOverlay {
            vars: parse(&content),
            path,
        })),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped,
/// `export ` prefixes are allowed, matching outer quotes are stripped.
pub fn parse(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                return None;
            }
            Some((key.to_string(), unquote(value.trim())))
        })
        .collect()
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            return if quote == '"' {
                inner.replace("\\n", "\n")
            } else {
                inner.to_string()
            };
        }
    }
    // Unquoted values may carry a trailing comment.
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}
