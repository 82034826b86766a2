//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Print `data`; table output shows `rows` instead
    pub fn emit<T, R>(&self, data: &T, rows: impl FnOnce() -> Vec<R>) -> Result<()>
    where
        T: Serialize + ?Sized,
        R: Tabled,
    {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
            OutputFormat::Table => println!("{}", table(rows())),
        }
        Ok(())
    }

    pub fn is_table(&self) -> bool {
        *self == OutputFormat::Table
    }
}

pub fn table<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Two-column row for key/value listings
#[derive(Tabled)]
pub struct KeyValue {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "!".yellow(), message.yellow());
}

pub fn failure(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Two decimals, as shown in tables
pub fn pct(value: f64) -> String {
    format!("{:.2}%", value)
}
