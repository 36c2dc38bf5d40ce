use crate::cli::output::{self, Format};
use anyhow::{Context, Result};
use powa_sql::{Params, Select, View, pg::PgClient};
use std::io::{self, Write};
use tracing::{debug, info};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Print the query without touching the database.
    Render {
        view: View,
        format: Format,
        validate: bool,
    },
    /// Run the query and print its rows.
    Fetch {
        view: View,
        dsn: String,
        params: Params,
        format: Format,
        validate: bool,
    },
}

impl Action {
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Render {
                view,
                format,
                validate,
            } => {
                let select = build(view, validate)?;
                let mut stdout = io::stdout().lock();
                render(&mut stdout, &select, format)
            }
            Self::Fetch {
                view,
                dsn,
                params,
                format,
                validate,
            } => {
                let select = build(view, validate)?;
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .context("Failed to start the tokio runtime")?;
                let rows = runtime.block_on(async {
                    let client = PgClient::connect(&dsn).await?;
                    client.fetch(&select, &params).await
                })?;

                let mut stdout = io::stdout().lock();
                match format {
                    Format::Csv => output::write_csv(&mut stdout, &select.output_columns(), &rows),
                    Format::Json => output::write_json(&mut stdout, &rows),
                    Format::Sql | Format::Positional => render(&mut stdout, &select, format),
                }
            }
        }
    }
}

fn build(view: View, validate: bool) -> Result<Select> {
    let select = view.select();
    info!(%view, columns = select.output_columns().len(), "built view");
    if validate {
        let (sql, _) = select.to_positional();
        pg_query::parse(&sql).with_context(|| format!("{view} does not parse as PostgreSQL"))?;
        debug!(%view, "validated");
    }
    Ok(select)
}

fn render<W: Write>(out: &mut W, select: &Select, format: Format) -> Result<()> {
    if format == Format::Positional {
        let (sql, names) = select.to_positional();
        return output::write_positional(out, &sql, &names);
    }
    writeln!(out, "{select};")?;
    Ok(())
}
