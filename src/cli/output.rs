use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::{fmt, io::Write, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// SQL with `:name` placeholders.
    Sql,
    /// SQL with `$n` placeholders, followed by the parameter order.
    Positional,
    /// One JSON object per row.
    Json,
    Csv,
}

impl Format {
    pub const NAMES: [&'static str; 4] = ["sql", "positional", "json", "csv"];

    /// Whether this format prints query results rather than the query.
    pub const fn needs_rows(self) -> bool {
        matches!(self, Self::Json | Self::Csv)
    }
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sql" => Ok(Self::Sql),
            "positional" => Ok(Self::Positional),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => bail!("unknown output format '{other}'"),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sql => "sql",
            Self::Positional => "positional",
            Self::Json => "json",
            Self::Csv => "csv",
        };
        f.write_str(name)
    }
}

pub fn write_positional<W: Write>(out: &mut W, sql: &str, names: &[String]) -> Result<()> {
    writeln!(out, "{sql};")?;
    for (i, name) in names.iter().enumerate() {
        writeln!(out, "-- ${} = :{name}", i + 1)?;
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, rows: &[Value]) -> Result<()> {
    for row in rows {
        serde_json::to_writer(&mut *out, row)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Writes `rows` as CSV with `columns` as header, in that order.
pub fn write_csv<W: Write>(out: W, columns: &[&str], rows: &[Value]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(columns)?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| cell(row.get(*column)))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
