//! Systematic sampling of statement history into per-step rate series.
//!
//! Rows are numbered per entity in time order and only every `stride`-th one
//! is kept, `stride = max(total / (:samples + 1), 1)`, so at most
//! `:samples + 1` points survive per entity. Consecutive surviving points
//! are then differenced with `lead()` and floored at zero.

use crate::{
    error::Error,
    sql::{
        Expr, Select, Source, Window,
        expr::{
            case_when, col, count_star, greatest, int, int8larger, interval, lead, null, param,
            row_number,
        },
    },
    views::history::{self, WindowBounds},
};
use std::{fmt, str::FromStr};

/// Entity a statement series is sampled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// One series per database.
    Db,
    /// One series per `(dbid, queryid)`.
    Query,
}

impl SampleMode {
    fn key_columns(self) -> Vec<Expr> {
        match self {
            Self::Db => vec![col("dbid")],
            Self::Query => vec![col("dbid"), col("queryid")],
        }
    }
}

impl FromStr for SampleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "db" => Ok(Self::Db),
            "query" => Ok(Self::Query),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Db => f.write_str("db"),
            Self::Query => f.write_str("query"),
        }
    }
}

/// `number % max(total / (:samples + 1), 1) = 0`
#[must_use]
pub fn stride_filter() -> Expr {
    (col("number") % int8larger(col("total") / (param("samples") + int(1)), int(1)))
        .equals(int(0))
}

/// Numbers `series` per `partition` in time order and keeps the rows picked
/// by [`stride_filter`].
pub(crate) fn systematic_sample(series: &str, partition: Vec<Expr>, alias: &'static str) -> String {
    let number = row_number()
        .over(Window::partition_by(partition.clone()).order_by(vec![col("ts")]))
        .label("number");
    let total = count_star()
        .over(Window::partition_by(partition))
        .label("total");
    format!(
        r"
        SELECT *
        FROM (
            SELECT {number}, {total}, *
            FROM ({series}
            ) AS {alias}
        ) AS numbered
        WHERE {stride}",
        stride = stride_filter(),
    )
}

/// `greatest(lead(column) - column, floor) AS label`, the increase of
/// `column` up to the next kept sample of the same entity.
///
/// `greatest` ignores NULL arguments, so the last sample of each entity is
/// matched explicitly to yield NULL rather than `floor`.
#[must_use]
pub fn biggest(partition: &[Expr], column: &'static str, floor: Expr, label: &'static str) -> Expr {
    let window = Window::partition_by(partition.to_vec()).order_by(vec![col("ts")]);
    let next = || lead(col(column)).over(window.clone());
    case_when(
        next().is_not_null(),
        greatest(next() - col(column), floor),
        null(),
    )
    .label(label)
}

/// Steps reported for sampled statement series.
fn sample_steps(partition: &[Expr]) -> Vec<Expr> {
    let mut steps = vec![biggest(partition, "ts", interval("0 s"), "mesure_interval")];
    steps.extend(
        [
            ("calls", "calls"),
            ("total_time", "runtime"),
            ("rows", "rows"),
            ("shared_blks_read", "shared_blks_read"),
            ("shared_blks_hit", "shared_blks_hit"),
            ("shared_blks_dirtied", "shared_blks_dirtied"),
            ("shared_blks_written", "shared_blks_written"),
            ("local_blks_read", "local_blks_read"),
            ("local_blks_hit", "local_blks_hit"),
            ("local_blks_dirtied", "local_blks_dirtied"),
            ("local_blks_written", "local_blks_written"),
            ("temp_blks_read", "temp_blks_read"),
            ("temp_blks_written", "temp_blks_written"),
            ("blk_read_time", "blk_read_time"),
            ("blk_write_time", "blk_write_time"),
        ]
        .into_iter()
        .map(|(column, label)| biggest(partition, column, int(0), label)),
    );
    steps
}

fn sample_source(mode: SampleMode) -> Source {
    match mode {
        SampleMode::Db => {
            let sampled = systematic_sample(
                &history::statements_db_series(WindowBounds::Closed),
                vec![col("dbid")],
                "statements_history",
            );
            Source::raw(format!(
                r"(
    SELECT pg_database.datname, base.*
    FROM pg_database,
    LATERAL ({sampled}
    ) AS base
) AS by_db"
            ))
        }
        SampleMode::Query => {
            let sampled = systematic_sample(
                &history::statements_query_series(WindowBounds::Closed),
                Vec::new(),
                "statements_history",
            );
            Source::raw(format!(
                r"(
    SELECT pg_database.datname, powa_statements.dbid, powa_statements.queryid, base.*
    FROM powa_statements
    JOIN pg_database ON pg_database.oid = powa_statements.dbid,
    LATERAL ({sampled}
    ) AS base
) AS by_query"
            ))
        }
    }
}

/// Sampled rate series over `[:from, :to]` with at most `:samples + 1`
/// points per entity.
#[must_use]
pub fn getstatdata_sample(mode: SampleMode) -> Select {
    let keys = mode.key_columns();
    let mut columns = keys.clone();
    columns.push(col("ts"));
    columns.extend(sample_steps(&keys));
    Select::new(columns).select_from(sample_source(mode))
}
