//! Whole-window statement activity: one row per entity holding the delta of
//! every cumulative counter across the window.

use crate::{
    sql::{
        Expr, Select,
        expr::{col, int, max, min},
    },
    views::history::{self, WindowBounds},
};

/// `max(column) - min(column)`, labeled with the column name.
///
/// Not clamped, unlike the sampler's steps: a counter reset inside the
/// window is passed through as whatever `max - min` gives.
#[must_use]
pub fn diff(column: &'static str) -> Expr {
    (max(col(column)) - min(col(column))).label(column)
}

/// Post-aggregation filter keeping groups where `column` moved in-window.
#[must_use]
pub fn has_activity(column: &'static str) -> Expr {
    (max(col(column)) - min(col(column))).greater_than(int(0))
}

/// Deltas reported for statement statistics.
#[must_use]
pub fn statdata_diffs() -> Vec<Expr> {
    vec![
        diff("calls"),
        diff("total_time").label("runtime"),
        diff("shared_blks_read"),
        diff("shared_blks_hit"),
        diff("shared_blks_dirtied"),
        diff("shared_blks_written"),
        diff("temp_blks_read"),
        diff("temp_blks_written"),
        diff("blk_read_time"),
        diff("blk_write_time"),
    ]
}

/// Per `(queryid, dbid, datname)` deltas over `[:from, :to]`.
#[must_use]
pub fn getstatdata_detailed_db() -> Select {
    let keys = vec![col("queryid"), col("dbid"), col("datname")];
    let columns = keys.iter().cloned().chain(statdata_diffs()).collect();
    Select::new(columns)
        .select_from(history::statements_detailed_db(WindowBounds::Closed))
        .group_by(keys)
        .having(has_activity("calls"))
}

/// Per `dbid` deltas over `[:from, :to]`.
#[must_use]
pub fn getstatdata_db() -> Select {
    let columns = std::iter::once(col("dbid")).chain(statdata_diffs()).collect();
    Select::new(columns)
        .select_from(history::statements_db(WindowBounds::Closed))
        .group_by(vec![col("dbid")])
        .having(has_activity("calls"))
}
