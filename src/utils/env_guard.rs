use std::fs;
use std::path::Path;

/// Parses `KEY=value` lines. Blank lines and `#` comments are skipped; one level of matching
/// quotes is removed; trailing `# ...` comments on unquoted values are dropped.
pub fn parse_dot_env(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        let parsed = if quoted {
            &value[1..value.len() - 1]
        } else {
            value.split('#').next().unwrap_or("").trim()
        };
        out.push((key.to_string(), parsed.to_string()));
    }
    out
}

/// Loads `path` into the process environment without overriding variables already set.
/// Returns how many keys were applied. A missing file is not an error.
pub fn load_dot_env(path: &Path) -> usize {
    if !path.exists() {
        return 0;
    }
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read env file");
            return 0;
        }
    };

    let mut applied = 0;
    for (key, value) in parse_dot_env(&content) {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(&key, value);
        applied += 1;
    }
    tracing::debug!(path = %path.display(), applied, "env file loaded");
    applied
}
