//! Predicate ("qual") statistics: hit counts and count-weighted filter
//! ratios, per `(queryid, nodehash)`.

use crate::{
    sql::{
        Expr, Select, Source, Window,
        expr::{case_when, col, int, int8larger, lead, qcol, sum, to_json},
    },
    views::{
        history::{self, WindowBounds},
        sample::systematic_sample,
        statements::{diff, has_activity},
    },
};

/// `sum(count * filter_ratio) / sum(count)`, or 0 when no hit was counted.
fn weighted_filter_ratio(window: Option<&Window>) -> Expr {
    let aggregate = |expr: Expr| match window {
        Some(window) => expr.over(window.clone()),
        None => expr,
    };
    let hits = || aggregate(sum(col("count")));
    case_when(
        hits().greater_than(int(0)),
        aggregate(sum(col("count") * col("filter_ratio"))) / hits(),
        int(0),
    )
}

/// Predicate statistics of every queryid normalized to `:query`, with a
/// blended filter ratio over `[:from, :to]`.
#[must_use]
pub fn qualstat_getstatdata() -> Select {
    Select::new(vec![
        col("nodehash"),
        col("queryid"),
        col("md5query"),
        to_json(col("quals")).label("quals"),
        diff("count"),
        weighted_filter_ratio(None).label("filter_ratio"),
    ])
    .select_from(history::qualstats(WindowBounds::Closed))
    .group_by(vec![
        col("nodehash"),
        col("queryid"),
        col("quals"),
        col("md5query"),
    ])
    .having(has_activity("count"))
}

/// Per-step predicate hits for each sampled interval of `[:from, :to)`.
fn qualstats_steps() -> Select {
    let querygroup = || Window::Named("querygroup");
    let sampled = systematic_sample(
        &history::qualstats_series(WindowBounds::HalfOpen),
        Vec::new(),
        "quals_history",
    );
    Select::new(vec![
        qcol("sh", "ts"),
        qcol("sh", "nodehash"),
        qcol("sh", "quals"),
        int8larger(lead(qcol("sh", "count")).over(querygroup()) - qcol("sh", "count"), int(0))
            .label("count"),
        weighted_filter_ratio(Some(&querygroup())).label("filter_ratio"),
    ])
    .select_from(Source::subquery(&sampled, "sh"))
    .window(
        "querygroup",
        Window::partition_by(vec![qcol("sh", "nodehash")]).order_by(vec![qcol("sh", "ts")]),
    )
}

/// Sampled predicate series, at most `:samples + 1` points per predicate.
///
/// The window here is half-open, unlike every other view.
#[must_use]
pub fn qualstat_getstatdata_sample() -> Select {
    let source = format!(
        r"
    powa_statements ps
    JOIN powa_qualstats_statements pqs USING (md5query)
    JOIN powa_qualstats_nodehash nh ON nh.queryid = pqs.queryid,
    LATERAL (
{steps}
    ) AS samples
    ",
        steps = qualstats_steps(),
    );
    Select::new(vec![
        qcol("nh", "queryid").label("queryid"),
        to_json(qcol("nh", "quals")).label("quals"),
        qcol("nh", "nodehash").label("nodehash"),
        qcol("samples", "ts"),
        qcol("samples", "count"),
        qcol("samples", "filter_ratio"),
        col("md5query"),
    ])
    .select_from(Source::raw(source))
    .filter(qcol("samples", "count").is_not_null())
}
