//! CLI Configuration
//!
//! Stored as TOML in `~/.formkit/config.toml`, or `config.<profile>.toml`
//! for a named profile. Keys are addressed with dots, e.g.
//! `validation.async_validation.timeout_ms`.

use crate::output::OutputFormat;
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use formkit_analytics::AnalyticsConfig;
use formkit_export::ExportConfig;
use formkit_validation::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// table, json or yaml
    pub default_format: String,
    pub validation: ValidationConfig,
    pub analytics: AnalyticsConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_format: "table".to_string(),
            validation: ValidationConfig::default(),
            analytics: AnalyticsConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".formkit").join(filename))
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_str(&self.default_format, true).unwrap_or(OutputFormat::Table)
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self)?;
        let value = key
            .split('.')
            .try_fold(&root, |node, part| node.get(part))
            .ok_or_else(|| anyhow!("Unknown config key: {}", key))?;
        Ok(display(value))
    }

    /// Set a leaf value; the text is read as the type the key already has
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut root = toml::Value::try_from(&*self)?;
        let mut node = &mut root;
        for part in key.split('.') {
            node = node
                .get_mut(part)
                .ok_or_else(|| anyhow!("Unknown config key: {}", key))?;
        }
        let replacement = match &*node {
            toml::Value::Integer(_) => toml::Value::Integer(raw.parse().with_context(|| format!("{} expects an integer", key))?),
            toml::Value::Float(_) => toml::Value::Float(raw.parse().with_context(|| format!("{} expects a number", key))?),
            toml::Value::Boolean(_) => toml::Value::Boolean(raw.parse().with_context(|| format!("{} expects true or false", key))?),
            toml::Value::String(_) => toml::Value::String(raw.to_string()),
            _ => bail!("{} is a section, not a value", key),
        };
        *node = replacement;
        *self = root.try_into()?;
        Ok(())
    }

    /// Every leaf as `(dotted key, value)`, sorted by key
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        flatten("", &toml::Value::try_from(self)?, &mut entries);
        entries.sort();
        Ok(entries)
    }
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                flatten(&path, child, out);
            }
        }
        leaf => out.push((prefix.to_string(), display(leaf))),
    }
}

fn display(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
