//! History readers: union the bucketed history tables (after expanding their
//! `records` arrays) with the not-yet-bucketed current tables, restricted to
//! the `:from` / `:to` window.

use crate::sql::Source;
use std::fmt;

/// How the `:from` / `:to` window is intersected with bucket ranges and
/// sample timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowBounds {
    /// `[from, to]`
    #[default]
    Closed,
    /// `[from, to)`, the `tstzrange` default.
    HalfOpen,
}

impl fmt::Display for WindowBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("tstzrange(:from, :to, '[]')"),
            Self::HalfOpen => f.write_str("tstzrange(:from, :to)"),
        }
    }
}

/// Statement samples per `(dbid, queryid)`, for every registered statement
/// of every database, aliased `h`. Joinable with `pg_database` columns.
#[must_use]
pub fn statements_detailed_db(window: WindowBounds) -> Source {
    Source::raw(format!(
        r"
    pg_database,
    LATERAL (
        SELECT unnested.dbid, unnested.queryid, (unnested.records).*
        FROM (
            SELECT psh.dbid, psh.queryid, psh.coalesce_range, unnest(psh.records) AS records
            FROM powa_statements_history psh
            WHERE psh.coalesce_range && {window}
            AND psh.dbid = pg_database.oid
            AND psh.queryid IN (SELECT ps.queryid FROM powa_statements ps WHERE ps.dbid = pg_database.oid)
        ) AS unnested
        WHERE {window} @> (unnested.records).ts
        UNION ALL
        SELECT psc.dbid, psc.queryid, (psc.record).*
        FROM powa_statements_history_current psc
        WHERE {window} @> (psc.record).ts
        AND psc.dbid = pg_database.oid
        AND psc.queryid IN (SELECT ps.queryid FROM powa_statements ps WHERE ps.dbid = pg_database.oid)
    ) AS h
    "
    ))
}

/// Database-wide samples per `dbid`, aliased `db_history`.
///
/// Only the buckets holding the earliest and latest overlapping timestamps
/// are expanded, plus the current row: enough for whole-window deltas
/// without unnesting every bucket in between.
#[must_use]
pub fn statements_db(window: WindowBounds) -> Source {
    Source::raw(format!(
        r"
    (
        SELECT dbh.dbid, min(lower(dbh.coalesce_range)) AS min_ts, max(upper(dbh.coalesce_range)) AS max_ts
        FROM powa_statements_history_db dbh
        JOIN pg_database ON dbh.dbid = pg_database.oid
        WHERE dbh.coalesce_range && {window}
        GROUP BY dbh.dbid
    ) AS ranges,
    LATERAL (
        SELECT (unnested1.records).*
        FROM (
            SELECT dbh.coalesce_range, unnest(dbh.records) AS records
            FROM powa_statements_history_db dbh
            WHERE dbh.coalesce_range @> ranges.min_ts
            AND dbh.dbid = ranges.dbid
        ) AS unnested1
        WHERE {window} @> (unnested1.records).ts
        UNION ALL
        SELECT (unnested2.records).*
        FROM (
            SELECT dbh.coalesce_range, unnest(dbh.records) AS records
            FROM powa_statements_history_db dbh
            WHERE dbh.coalesce_range @> ranges.max_ts
            AND dbh.dbid = ranges.dbid
        ) AS unnested2
        WHERE {window} @> (unnested2.records).ts
        UNION ALL
        SELECT (dbc.record).*
        FROM powa_statements_history_current_db dbc
        WHERE {window} @> (dbc.record).ts
        AND dbc.dbid = ranges.dbid
    ) AS db_history
    "
    ))
}

/// Samples of the database correlated as `pg_database`, with a `dbid` column.
pub(crate) fn statements_db_series(window: WindowBounds) -> String {
    format!(
        r"
                SELECT unnested.dbid, (unnested.records).*
                FROM (
                    SELECT psh.dbid, psh.coalesce_range, unnest(psh.records) AS records
                    FROM powa_statements_history_db psh
                    WHERE psh.coalesce_range && {window}
                    AND psh.dbid = pg_database.oid
                ) AS unnested
                WHERE {window} @> (unnested.records).ts
                UNION ALL
                SELECT dbc.dbid, (dbc.record).*
                FROM powa_statements_history_current_db dbc
                WHERE {window} @> (dbc.record).ts
                AND dbc.dbid = pg_database.oid"
    )
}

/// Samples of the statement correlated as `powa_statements`.
pub(crate) fn statements_query_series(window: WindowBounds) -> String {
    format!(
        r"
                SELECT (unnested.records).*
                FROM (
                    SELECT psh.queryid, psh.coalesce_range, unnest(psh.records) AS records
                    FROM powa_statements_history psh
                    WHERE psh.coalesce_range && {window}
                    AND psh.queryid = powa_statements.queryid
                    AND psh.dbid = powa_statements.dbid
                ) AS unnested
                WHERE {window} @> (unnested.records).ts
                UNION ALL
                SELECT (phc.record).*
                FROM powa_statements_history_current phc
                WHERE {window} @> (phc.record).ts
                AND phc.queryid = powa_statements.queryid
                AND phc.dbid = powa_statements.dbid"
    )
}

/// Samples of the predicate correlated as `nh`, keyed by
/// `(queryid, nodehash)`.
pub(crate) fn qualstats_series(window: WindowBounds) -> String {
    format!(
        r"
                SELECT unnested.queryid, unnested.nodehash, (unnested.records).*
                FROM (
                    SELECT nhh.queryid, nhh.nodehash, nhh.coalesce_range, unnest(nhh.records) AS records
                    FROM powa_qualstats_nodehash_history nhh
                    WHERE nhh.coalesce_range && {window}
                    AND nhh.queryid = nh.queryid AND nhh.nodehash = nh.nodehash
                ) AS unnested
                WHERE {window} @> (unnested.records).ts
                UNION ALL
                SELECT pqnc.queryid, pqnc.nodehash, pqnc.ts, pqnc.quals, pqnc.avg_filter_ratio, pqnc.count
                FROM powa_qualstats_nodehash_current pqnc
                WHERE {window} @> pqnc.ts
                AND pqnc.queryid = nh.queryid AND pqnc.nodehash = nh.nodehash"
    )
}

/// Predicate samples of every queryid normalized to `:query` (an
/// `md5query`), joined back to `powa_qualstats_statements` for `md5query`.
#[must_use]
pub fn qualstats(window: WindowBounds) -> Source {
    Source::raw(format!(
        r"
    (
        SELECT unnested.nodehash, unnested.queryid, (unnested.records).*
        FROM (
            SELECT pqnh.nodehash, pqnh.queryid, pqnh.coalesce_range, unnest(pqnh.records) AS records
            FROM powa_qualstats_nodehash_history pqnh
            WHERE pqnh.coalesce_range && {window}
            AND pqnh.queryid IN (SELECT pqs.queryid FROM powa_qualstats_statements pqs WHERE pqs.md5query = :query)
        ) AS unnested
        WHERE {window} @> (unnested.records).ts
        UNION ALL
        SELECT pqnc.nodehash, pqnc.queryid, pqnc.ts, pqnc.quals, pqnc.avg_filter_ratio, pqnc.count
        FROM powa_qualstats_nodehash_current pqnc
        WHERE {window} @> pqnc.ts
        AND pqnc.queryid IN (SELECT pqs.queryid FROM powa_qualstats_statements pqs WHERE pqs.md5query = :query)
    ) AS h
    JOIN powa_qualstats_statements USING (queryid)
    "
    ))
}
