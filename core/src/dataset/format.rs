use std::path::Path;

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

/// Serialization formats accepted for fixtures and config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Pick a format from the file extension, if it is one we know.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
        }
    }
}

/// Guess the format of `input` when the path carries no usable extension.
pub fn detect_format(input: &str) -> Format {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Format::Json;
    }

    // checked before the bracket test: `[[observations]]` also opens with '['
    if starts_with_table_header(trimmed) {
        return Format::Toml;
    }

    if (trimmed.starts_with('{') && trimmed.ends_with('}')) || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return Format::Json;
    }

    if has_toml_indicators(trimmed) {
        return Format::Toml;
    }

    Format::Yaml
}

fn starts_with_table_header(input: &str) -> bool {
    let Some(first) = input
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
    else {
        return false;
    };
    let name = first
        .strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
        .or_else(|| first.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')));
    match name.map(str::trim) {
        Some(name) => {
            name.starts_with(|c: char| c.is_alphabetic() || c == '_')
                && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        }
        None => false,
    }
}

fn has_toml_indicators(input: &str) -> bool {
    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        // [table] or [[array-of-tables]] headers
        if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() > 2 {
            return true;
        }

        if let Some(eq_pos) = trimmed.find('=') {
            let key_part = trimmed[..eq_pos].trim();
            let value_part = trimmed[eq_pos + 1..].trim();
            if !key_part.is_empty()
                && !value_part.is_empty()
                && key_part
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
            {
                return true;
            }
        }
    }

    false
}

pub fn parse_str<T: DeserializeOwned>(input: &str, format: Format) -> Result<T> {
    match format {
        Format::Json => serde_json::from_str(input).context("invalid JSON"),
        Format::Yaml => serde_yaml::from_str(input).context("invalid YAML"),
        Format::Toml => toml::from_str(input).context("invalid TOML"),
    }
}

pub fn to_string<T: Serialize>(value: &T, format: Format) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(value).context("serialize JSON"),
        Format::Yaml => serde_yaml::to_string(value).context("serialize YAML"),
        Format::Toml => toml::to_string_pretty(value).context("serialize TOML"),
    }
}

/// Read and decode a file, using its extension first and content sniffing second.
pub fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let format = Format::from_path(path).unwrap_or_else(|| detect_format(&contents));
    parse_str(&contents, format).with_context(|| format!("parse {} as {}", path.display(), format.label()))
}
