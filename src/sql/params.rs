use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Rewrites `:name` placeholders into PostgreSQL positional `$n` markers.
///
/// A name used several times maps to a single position. `::` casts and
/// anything inside single or double quotes are left untouched.
#[must_use]
pub fn to_positional(sql: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            ':' if chars.peek() == Some(&':') => {
                out.push_str("::");
                chars.next();
            }
            ':' if chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let position = match names.iter().position(|known| *known == name) {
                    Some(index) => index + 1,
                    None => {
                        names.push(name);
                        names.len()
                    }
                };
                out.push('$');
                out.push_str(&position.to_string());
            }
            _ => out.push(c),
        }
    }

    (out, names)
}

/// A value bound to one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Timestamp(DateTime<Utc>),
    BigInt(i64),
    Text(String),
}

/// Values for the placeholders the views use: `from`, `to`, `samples` and
/// `query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    samples: Option<i64>,
    query: Option<String>,
}

impl Params {
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindow`] when `from` is after `to`.
    pub fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidWindow {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        Ok(Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidSamples`] when `samples` is below 1.
    pub fn with_samples(mut self, samples: i64) -> Result<Self> {
        if samples < 1 {
            return Err(Error::InvalidSamples(samples));
        }
        self.samples = Some(samples);
        Ok(self)
    }

    /// Sets the `md5query` the predicate views are restricted to.
    #[must_use]
    pub fn with_query(mut self, md5query: impl Into<String>) -> Self {
        self.query = Some(md5query.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] when the placeholder is known but
    /// unset, [`Error::UnknownParameter`] when it is not one of ours.
    pub fn value(&self, name: &str) -> Result<Value> {
        match name {
            "from" => self
                .from
                .map(Value::Timestamp)
                .ok_or(Error::MissingParameter("from")),
            "to" => self
                .to
                .map(Value::Timestamp)
                .ok_or(Error::MissingParameter("to")),
            "samples" => self
                .samples
                .map(Value::BigInt)
                .ok_or(Error::MissingParameter("samples")),
            "query" => self
                .query
                .clone()
                .map(Value::Text)
                .ok_or(Error::MissingParameter("query")),
            other => Err(Error::UnknownParameter(other.to_string())),
        }
    }

    /// Resolves positional parameter names into bind values.
    ///
    /// # Errors
    ///
    /// Fails on the first name that cannot be resolved, see [`Params::value`].
    pub fn values_for(&self, names: &[String]) -> Result<Vec<Value>> {
        names.iter().map(|name| self.value(name)).collect()
    }
}
