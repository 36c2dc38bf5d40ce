use crate::sql::{Params, Select, Value};
use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{debug, info};
use url::Url;

pub struct PgClient {
    pool: PgPool,
}

impl PgClient {
    /// # Errors
    ///
    /// Fails when the DSN is invalid or the server cannot be reached.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(dsn)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to Postgres with DSN: {}",
                    redact_dsn(dsn)
                )
            })?;
        debug!(dsn = %redact_dsn(dsn), "connected");
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Binds `params` to the placeholders of `select`, executes it and
    /// returns each row as a JSON object keyed by column name.
    ///
    /// # Errors
    ///
    /// Fails when a placeholder has no value in `params`, or on any
    /// database error.
    pub async fn fetch(&self, select: &Select, params: &Params) -> Result<Vec<serde_json::Value>> {
        let (sql, names) = select.to_positional();
        let values = params.values_for(&names)?;
        let wrapped = format!("SELECT row_to_json(q)::text FROM (\n{sql}\n) AS q");
        debug!(parameters = ?names, "{wrapped}");

        let mut query = sqlx::query_scalar::<_, String>(&wrapped);
        for value in values {
            query = match value {
                Value::Timestamp(ts) => query.bind(ts),
                Value::BigInt(n) => query.bind(n),
                Value::Text(s) => query.bind(s),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to execute view query")?;
        info!(rows = rows.len(), "fetched");

        rows.iter()
            .map(|row| serde_json::from_str(row).context("Invalid row_to_json output"))
            .collect()
    }
}

/// Masks the password of a URI or `key=value` DSN.
#[must_use]
pub fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("****")).is_err() {
                return "<invalid dsn>".to_string();
            }
            url.to_string()
        }
        Err(_) => dsn
            .split_whitespace()
            .map(|pair| {
                if pair.starts_with("password=") {
                    "password=****"
                } else {
                    pair
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}
