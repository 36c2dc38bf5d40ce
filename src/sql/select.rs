use crate::sql::{
    expr::{Expr, List, Window},
    params::to_positional,
};
use std::fmt;

/// A from-clause source: table list, joins, `LATERAL` subqueries.
///
/// Sources are SQL text built by this crate's constructor functions and may
/// reference named placeholders (`:from`, `:to`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source(String);

impl Source {
    pub(crate) fn raw(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Wraps a statement as `(SELECT ...) AS alias`.
    pub(crate) fn subquery(select: &impl fmt::Display, alias: &'static str) -> Self {
        Self(format!("(\n{}\n) AS {alias}", select.to_string().trim()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim())
    }
}

/// An unexecuted `SELECT` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    columns: Vec<Expr>,
    from: Option<Source>,
    filter: Option<Expr>,
    group_by: Vec<Expr>,
    having: Option<Expr>,
    windows: Vec<(&'static str, Window)>,
}

impl Select {
    #[must_use]
    pub const fn new(columns: Vec<Expr>) -> Self {
        Self {
            columns,
            from: None,
            filter: None,
            group_by: Vec::new(),
            having: None,
            windows: Vec::new(),
        }
    }

    #[must_use]
    pub fn select_from(mut self, source: Source) -> Self {
        self.from = Some(source);
        self
    }

    #[must_use]
    pub fn filter(mut self, condition: Expr) -> Self {
        self.filter = Some(condition);
        self
    }

    #[must_use]
    pub fn group_by(mut self, keys: Vec<Expr>) -> Self {
        self.group_by = keys;
        self
    }

    #[must_use]
    pub fn having(mut self, condition: Expr) -> Self {
        self.having = Some(condition);
        self
    }

    /// Declares a named window usable as `OVER name`.
    #[must_use]
    pub fn window(mut self, name: &'static str, window: Window) -> Self {
        self.windows.push((name, window));
        self
    }

    /// Names of the result columns, in select-list order.
    #[must_use]
    pub fn output_columns(&self) -> Vec<&'static str> {
        self.columns.iter().map(Expr::output_name).collect()
    }

    /// Distinct placeholder names in order of first use.
    #[must_use]
    pub fn parameters(&self) -> Vec<String> {
        to_positional(&self.to_string()).1
    }

    /// Renders the statement with `$n` placeholders, returning the SQL and
    /// the parameter name bound to each position.
    #[must_use]
    pub fn to_positional(&self) -> (String, Vec<String>) {
        to_positional(&self.to_string())
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {}", List(&self.columns))?;
        if let Some(source) = &self.from {
            write!(f, "\nFROM {source}")?;
        }
        if let Some(filter) = &self.filter {
            write!(f, "\nWHERE {filter}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, "\nGROUP BY {}", List(&self.group_by))?;
        }
        if let Some(having) = &self.having {
            write!(f, "\nHAVING {having}")?;
        }
        for (i, (name, window)) in self.windows.iter().enumerate() {
            let keyword = if i == 0 { "\nWINDOW" } else { "," };
            write!(f, "{keyword} {name} AS {window}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::expr::{col, int, lead, max, min, param, sum};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_full_statement() {
        let select = Select::new(vec![
            col("dbid"),
            (max(col("calls")) - min(col("calls"))).label("calls"),
        ])
        .select_from(Source::raw("powa_statements_history_current_db"))
        .filter(col("dbid").equals(param("dbid")))
        .group_by(vec![col("dbid")])
        .having((max(col("calls")) - min(col("calls"))).greater_than(int(0)));

        assert_eq!(
            select.to_string(),
            "SELECT dbid, max(calls) - min(calls) AS calls\n\
             FROM powa_statements_history_current_db\n\
             WHERE dbid = :dbid\n\
             GROUP BY dbid\n\
             HAVING (max(calls) - min(calls)) > 0"
        );
        assert_eq!(select.output_columns(), vec!["dbid", "calls"]);
        assert_eq!(select.parameters(), vec!["dbid".to_string()]);
    }

    #[test]
    fn test_named_windows() {
        let select = Select::new(vec![
            lead(col("count")).over(Window::Named("w")),
            sum(col("count")).over(Window::Named("v")),
        ])
        .select_from(Source::raw("t"))
        .window("w", Window::partition_by(vec![col("nodehash")]).order_by(vec![col("ts")]))
        .window("v", Window::partition_by(vec![col("nodehash")]));

        assert_eq!(
            select.to_string(),
            "SELECT lead(count) OVER w, sum(count) OVER v\n\
             FROM t\n\
             WINDOW w AS (PARTITION BY nodehash ORDER BY ts), v AS (PARTITION BY nodehash)"
        );
    }

    #[test]
    fn test_subquery_source() {
        let inner = Select::new(vec![col("ts")]).select_from(Source::raw("  t  "));
        let outer = Select::new(vec![col("ts")]).select_from(Source::subquery(&inner, "q"));
        assert_eq!(outer.to_string(), "SELECT ts\nFROM (\nSELECT ts\nFROM t\n) AS q");
    }
}
