use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::HttpError;

/// A read-only `KEY=value` configuration snapshot, passed to every handler
/// alongside the request and its route parameters. The server does not
/// interpret any key itself; it only loads and forwards the map.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Loads a dotenv-shaped configuration file: blank lines and `#` comments
/// are skipped, every other line is `KEY=value`, and a value may be quoted
/// with matching single or double quotes. Inside double quotes only, the
/// escapes `\n \r \t \\ \"` are interpreted; everywhere else a backslash is
/// literal. A line with no `=` is logged and skipped rather than failing
/// the whole load.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, HttpError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| HttpError::Startup(format!("failed to read config {}: {e}", path.display())))?;
    Ok(Config {
        values: parse_dotenv(&text),
    })
}

fn parse_dotenv(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, raw_value)) = trimmed.split_once('=') else {
            log::warn!("ignoring malformed config line: {line}");
            continue;
        };
        values.insert(key.trim().to_string(), unquote(raw_value.trim()));
    }
    values
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        return unescape_double_quoted(&value[1..value.len() - 1]);
    }
    if bytes.len() >= 2 && bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
        return value[1..value.len() - 1].to_string();
    }
    value.to_string()
}

fn unescape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let parsed = parse_dotenv("# a comment\n\nKEY=value\n");
        assert_eq!(parsed.get("KEY").map(String::as_str), Some("value"));
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn strips_single_and_double_quotes() {
        let parsed = parse_dotenv("A=\"double\"\nB='single'\n");
        assert_eq!(parsed.get("A").map(String::as_str), Some("double"));
        assert_eq!(parsed.get("B").map(String::as_str), Some("single"));
    }

    #[test]
    fn interprets_escapes_only_inside_double_quotes() {
        let parsed = parse_dotenv("A=\"line\\nbreak\"\nB='line\\nbreak'\n");
        assert_eq!(parsed.get("A").map(String::as_str), Some("line\nbreak"));
        assert_eq!(parsed.get("B").map(String::as_str), Some("line\\nbreak"));
    }

    #[test]
    fn malformed_line_without_equals_is_skipped() {
        let parsed = parse_dotenv("not-a-kv-pair\nGOOD=1\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("GOOD").map(String::as_str), Some("1"));
    }
}
