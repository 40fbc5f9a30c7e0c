//! Output formatting

use anyhow::{bail, Result};
use clap::ValueEnum;
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
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => bail!("unknown output format: {}", other),
        }
    }

    /// Structured documents only; tables fall back to JSON.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Yaml => serde_yaml::to_string(data)?,
            OutputFormat::Json | OutputFormat::Table => serde_json::to_string_pretty(data)?,
        })
    }

    pub fn render_rows<R: Tabled + Serialize>(&self, rows: &[R]) -> Result<String> {
        match self {
            OutputFormat::Table => {
                let mut table = Table::new(rows);
                table.with(Style::rounded());
                Ok(table.to_string())
            }
            _ => self.render(&rows),
        }
    }

    pub fn print_rows<R: Tabled + Serialize>(&self, rows: &[R]) -> Result<()> {
        println!("{}", self.render_rows(rows)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct Row {
        stack: String,
        region: String,
    }

    fn rows() -> Vec<Row> {
        vec![Row {
            stack: "uat-shared-network".into(),
            region: "us-east-1".into(),
        }]
    }

    #[test]
    fn test_parse() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::parse("xml").is_err());
    }

    #[test]
    fn test_render_rows() {
        let table = OutputFormat::Table.render_rows(&rows()).unwrap();
        assert!(table.contains("stack"));
        assert!(table.contains("uat-shared-network"));

        let json = OutputFormat::Json.render_rows(&rows()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["region"], "us-east-1");

        let yaml = OutputFormat::Yaml.render_rows(&rows()).unwrap();
        assert!(yaml.contains("stack: uat-shared-network"));
    }
}
