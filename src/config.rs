use crate::action::{Form, DEFAULT_MODULE};
use crate::error::ShellError;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use std::fs;
use std::path::Path;

#[cfg(windows)]
pub const DEFAULT_INTERPRETER: &str = "powershell.exe";
#[cfg(not(windows))]
pub const DEFAULT_INTERPRETER: &str = "pwsh";

lazy_static! {
    static ref SETTING_LINE: Regex = Regex::new(r"^\s*([A-Za-z_]+)\s*=\s*(.*?)\s*$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub interpreter: String,
    pub module: String,
    pub defaults: Form,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            module: DEFAULT_MODULE.to_string(),
            defaults: Form::default(),
        }
    }
}

/// Reads a `key = value` settings file on top of the built-in defaults.
pub fn read_settings(path: &Path) -> Result<Settings, ShellError> {
    info!("Reading config file: {}", path.display());
    let content = fs::read_to_string(path)
        .map_err(|e| ShellError::ConfigRead(path.display().to_string(), e))?;
    parse_settings(&content)
}

pub fn parse_settings(content: &str) -> Result<Settings, ShellError> {
    let mut settings = Settings::default();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let captures = SETTING_LINE.captures(trimmed).ok_or_else(|| ShellError::ConfigParse {
            line,
            reason: format!("expected 'key = value', got '{}'", trimmed),
        })?;
        let key = &captures[1];
        let value = unquote(&captures[2]).to_string();
        debug!("Setting {} = {}", key, value);

        match key {
            "interpreter" => settings.interpreter = value,
            "module" => settings.module = value,
            "name_pattern" => settings.defaults.name_pattern = value,
            "destination_path" => settings.defaults.destination_path = value,
            "keep" => settings.defaults.keep = value,
            "compression_level" => settings.defaults.compression_level = value,
            "what_if" => {
                settings.defaults.what_if =
                    parse_bool(&value).ok_or_else(|| ShellError::ConfigParse {
                        line,
                        reason: format!("'{}' is not a boolean", value),
                    })?
            }
            other => {
                return Err(ShellError::ConfigParse {
                    line,
                    reason: format!("unknown key '{}'", other),
                })
            }
        }
    }

    Ok(settings)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
