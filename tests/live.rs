//! Runs the views against a scratch copy of the PoWA history tables.
//!
//! Set `POWA_TEST_DSN` to a database the tests may create the
//! `powa_sql_test` schema in; without it every test returns early.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use powa_sql::{
    Params, SampleMode,
    pg::PgClient,
    views::{
        getstatdata_db, getstatdata_detailed_db, getstatdata_sample, qualstat_getstatdata,
        qualstat_getstatdata_sample,
    },
};
use serde_json::{Value, json};
use sqlx::{Executor, postgres::PgPoolOptions};

const SCHEMA: &str = r"
DROP SCHEMA IF EXISTS powa_sql_test CASCADE;
CREATE SCHEMA powa_sql_test;

CREATE TYPE powa_statements_history_record AS (
    ts timestamptz,
    calls bigint,
    total_time double precision,
    rows bigint,
    shared_blks_read bigint,
    shared_blks_hit bigint,
    shared_blks_dirtied bigint,
    shared_blks_written bigint,
    local_blks_read bigint,
    local_blks_hit bigint,
    local_blks_dirtied bigint,
    local_blks_written bigint,
    temp_blks_read bigint,
    temp_blks_written bigint,
    blk_read_time double precision,
    blk_write_time double precision
);
CREATE TYPE powa_qualstats_history_item AS (
    ts timestamptz,
    quals text[],
    filter_ratio double precision,
    count bigint
);

CREATE TABLE powa_statements (queryid bigint, dbid oid, md5query text);
CREATE TABLE powa_statements_history (queryid bigint, dbid oid, coalesce_range tstzrange, records powa_statements_history_record[]);
CREATE TABLE powa_statements_history_current (queryid bigint, dbid oid, record powa_statements_history_record);
CREATE TABLE powa_statements_history_db (dbid oid, coalesce_range tstzrange, records powa_statements_history_record[]);
CREATE TABLE powa_statements_history_current_db (dbid oid, record powa_statements_history_record);
CREATE TABLE powa_qualstats_statements (md5query text, queryid bigint);
CREATE TABLE powa_qualstats_nodehash (queryid bigint, nodehash bigint, quals text[]);
CREATE TABLE powa_qualstats_nodehash_history (queryid bigint, nodehash bigint, coalesce_range tstzrange, records powa_qualstats_history_item[]);
CREATE TABLE powa_qualstats_nodehash_current (queryid bigint, nodehash bigint, ts timestamptz, quals text[], avg_filter_ratio double precision, count bigint);

CREATE FUNCTION t(s integer) RETURNS timestamptz LANGUAGE sql IMMUTABLE AS
$$ SELECT timestamptz '2026-10-01 00:00:00+00' + s * interval '1 second' $$;

CREATE FUNCTION bucket(lo integer, hi integer) RETURNS tstzrange LANGUAGE sql IMMUTABLE AS
$$ SELECT tstzrange(t(lo), t(hi), '[]') $$;

CREATE FUNCTION this_db() RETURNS oid LANGUAGE sql STABLE AS
$$ SELECT oid FROM pg_database WHERE datname = current_database() $$;

CREATE FUNCTION rec(s integer, calls bigint) RETURNS powa_statements_history_record LANGUAGE sql IMMUTABLE AS
$$ SELECT ROW(t(s), calls, (calls * 1.5)::float8, calls,
              0::bigint, 0::bigint, 0::bigint, 0::bigint,
              0::bigint, 0::bigint, 0::bigint, 0::bigint,
              0::bigint, 0::bigint, 0::float8, 0::float8)::powa_statements_history_record $$;

CREATE FUNCTION qrec(s integer, filter_ratio float8, count bigint) RETURNS powa_qualstats_history_item LANGUAGE sql IMMUTABLE AS
$$ SELECT ROW(t(s), ARRAY['id = ?'], filter_ratio, count)::powa_qualstats_history_item $$;
";

async fn setup(fixtures: &str) -> Result<Option<PgClient>> {
    let Ok(dsn) = std::env::var("POWA_TEST_DSN") else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET search_path = powa_sql_test, public").await?;
                Ok(())
            })
        })
        .connect(&dsn)
        .await?;
    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    sqlx::raw_sql(fixtures).execute(&pool).await?;
    Ok(Some(PgClient::from_pool(pool)))
}

fn t(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_790_812_800, 0).unwrap_or_default() + Duration::seconds(secs)
}

fn nth(rows: &[Value], index: usize) -> Result<&Value> {
    rows.get(index)
        .with_context(|| format!("no row {index} in {rows:?}"))
}

fn sorted_by_ts(mut rows: Vec<Value>) -> Vec<Value> {
    rows.sort_by(|a, b| a["ts"].as_str().cmp(&b["ts"].as_str()));
    rows
}

#[tokio::test]
#[serial_test::serial]
async fn db_delta_spans_buckets_and_current() -> Result<()> {
    let Some(client) = setup(
        r"
        INSERT INTO powa_statements_history_db VALUES
            (this_db(), bucket(-30, 20), ARRAY[rec(-10, 1), rec(10, 2)]),
            (this_db(), bucket(20, 40), ARRAY[rec(30, 4)]);
        INSERT INTO powa_statements_history_current_db VALUES (this_db(), rec(50, 5));
        ",
    )
    .await?
    else {
        return Ok(());
    };

    let rows = client
        .fetch(&getstatdata_db(), &Params::window(t(0), t(60))?)
        .await?;
    assert_eq!(rows.len(), 1);
    let row = nth(&rows, 0)?;
    assert_eq!(row["calls"], json!(3));
    assert_eq!(row["runtime"], json!(4.5));
    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn db_without_activity_is_dropped() -> Result<()> {
    let Some(client) = setup(
        r"
        INSERT INTO powa_statements_history_db VALUES
            (this_db(), bucket(0, 20), ARRAY[rec(10, 2)]);
        INSERT INTO powa_statements_history_current_db VALUES (this_db(), rec(50, 2));
        ",
    )
    .await?
    else {
        return Ok(());
    };

    let rows = client
        .fetch(&getstatdata_db(), &Params::window(t(0), t(60))?)
        .await?;
    assert!(rows.is_empty(), "{rows:?}");
    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn detailed_delta_is_max_minus_min() -> Result<()> {
    let Some(client) = setup(
        r"
        INSERT INTO powa_statements VALUES (42, this_db(), 'q42'), (43, this_db(), 'q43');
        INSERT INTO powa_statements_history VALUES
            (42, this_db(), bucket(0, 30), ARRAY[rec(5, 3), rec(15, 10), rec(25, 7)]),
            (43, this_db(), bucket(0, 30), ARRAY[rec(5, 1)]),
            (99, this_db(), bucket(0, 30), ARRAY[rec(5, 1), rec(25, 50)]);
        INSERT INTO powa_statements_history_current VALUES
            (43, this_db(), rec(40, 6)),
            (42, this_db(), rec(90, 100));
        ",
    )
    .await?
    else {
        return Ok(());
    };

    let mut rows = client
        .fetch(&getstatdata_detailed_db(), &Params::window(t(0), t(60))?)
        .await?;
    rows.sort_by_key(|row| row["queryid"].as_i64());

    // 99 is not a registered statement, 42's current sample is out of window
    let deltas: Vec<_> = rows
        .iter()
        .map(|row| (row["queryid"].clone(), row["calls"].clone()))
        .collect();
    assert_eq!(deltas, vec![(json!(42), json!(7)), (json!(43), json!(5))]);
    assert!(rows.iter().all(|row| row["datname"].is_string()));
    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn sample_keeps_every_stride_row() -> Result<()> {
    let Some(client) = setup(
        r"
        INSERT INTO powa_statements_history_db
        SELECT this_db(), bucket(0, 120), array_agg(rec(s * 10, s) ORDER BY s)
        FROM generate_series(1, 12) AS s;
        ",
    )
    .await?
    else {
        return Ok(());
    };

    // 12 rows, 2 samples: stride 12 / 3 = 4, rows 4, 8 and 12 survive
    let params = Params::window(t(0), t(120))?.with_samples(2)?;
    let rows = sorted_by_ts(client.fetch(&getstatdata_sample(SampleMode::Db), &params).await?);
    let calls: Vec<_> = rows.iter().map(|row| row["calls"].clone()).collect();
    assert_eq!(calls, vec![json!(4), json!(4), Value::Null]);
    let intervals: Vec<_> = rows.iter().map(|row| row["mesure_interval"].clone()).collect();
    assert_eq!(intervals, vec![json!("00:00:40"), json!("00:00:40"), Value::Null]);

    // fewer rows than the budget: stride 1, everything survives
    let params = Params::window(t(0), t(120))?.with_samples(50)?;
    let rows = client.fetch(&getstatdata_sample(SampleMode::Db), &params).await?;
    assert_eq!(rows.len(), 12);
    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn sample_steps_are_never_negative() -> Result<()> {
    let Some(client) = setup(
        r"
        INSERT INTO powa_statements VALUES (7, this_db(), 'q7');
        INSERT INTO powa_statements_history VALUES
            (7, this_db(), bucket(0, 30), ARRAY[rec(10, 5), rec(20, 2)]);
        INSERT INTO powa_statements_history_current VALUES (7, this_db(), rec(30, 9));
        ",
    )
    .await?
    else {
        return Ok(());
    };

    let params = Params::window(t(0), t(60))?.with_samples(5)?;
    let rows = sorted_by_ts(
        client
            .fetch(&getstatdata_sample(SampleMode::Query), &params)
            .await?,
    );
    let calls: Vec<_> = rows.iter().map(|row| row["calls"].clone()).collect();
    assert_eq!(calls, vec![json!(0), json!(7), Value::Null]);
    assert_eq!(nth(&rows, 2)?["mesure_interval"], Value::Null);
    assert!(rows.iter().all(|row| row["queryid"] == json!(7)));
    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn qual_ratio_keeps_queryids_apart() -> Result<()> {
    let Some(client) = setup(
        r"
        INSERT INTO powa_qualstats_statements VALUES ('abc123', 1), ('abc123', 2), ('abc123', 3), ('other', 4);
        INSERT INTO powa_qualstats_nodehash_history VALUES
            (1, 77, bucket(0, 30), ARRAY[qrec(10, 0.5, 10)]),
            (2, 77, bucket(0, 30), ARRAY[qrec(10, 0.9, 1)]),
            (3, 88, bucket(0, 30), ARRAY[qrec(10, 0.3, 0), qrec(20, 0.3, 0)]),
            (4, 77, bucket(0, 30), ARRAY[qrec(10, 0.1, 1)]);
        INSERT INTO powa_qualstats_nodehash_current VALUES
            (1, 77, t(40), ARRAY['id = ?'], 0.1, 30),
            (2, 77, t(40), ARRAY['id = ?'], 0.9, 3),
            (4, 77, t(40), ARRAY['id = ?'], 0.1, 9);
        ",
    )
    .await?
    else {
        return Ok(());
    };

    let params = Params::window(t(0), t(60))?.with_query("abc123");
    let mut rows = client.fetch(&qualstat_getstatdata(), &params).await?;
    rows.sort_by_key(|row| row["queryid"].as_i64());

    assert_eq!(rows.len(), 2, "{rows:?}");
    let first = nth(&rows, 0)?;
    assert_eq!(first["queryid"], json!(1));
    assert_eq!(nth(&rows, 1)?["queryid"], json!(2));
    assert!(rows.iter().all(|row| row["nodehash"] == json!(77)));
    assert!(rows.iter().all(|row| row["md5query"] == json!("abc123")));
    assert_eq!(first["count"], json!(20));

    // (10 * 0.5 + 30 * 0.1) / 40
    let ratio = first["filter_ratio"].as_f64().unwrap_or(f64::NAN);
    assert!((ratio - 0.2).abs() < 1e-9, "{ratio}");
    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn qual_sample_is_half_open() -> Result<()> {
    let Some(client) = setup(
        r"
        INSERT INTO powa_statements VALUES (500, this_db(), 'abc123');
        INSERT INTO powa_qualstats_statements VALUES ('abc123', 1);
        INSERT INTO powa_qualstats_nodehash VALUES (1, 77, ARRAY['id = ?']);
        INSERT INTO powa_qualstats_nodehash_history VALUES
            (1, 77, bucket(0, 30), ARRAY[qrec(10, 0.5, 0), qrec(20, 0.5, 10), qrec(30, 0.2, 25)]);
        INSERT INTO powa_qualstats_nodehash_current VALUES (1, 77, t(60), ARRAY['id = ?'], 0.1, 100);
        ",
    )
    .await?
    else {
        return Ok(());
    };

    // the current sample sits exactly on the upper bound and is excluded
    let params = Params::window(t(0), t(60))?.with_samples(10)?;
    let rows = sorted_by_ts(client.fetch(&qualstat_getstatdata_sample(), &params).await?);
    let counts: Vec<_> = rows.iter().map(|row| row["count"].clone()).collect();
    assert_eq!(counts, vec![json!(10), json!(15)]);
    assert_eq!(nth(&rows, 0)?["quals"], json!(["id = ?"]));

    // running ratio over steps with hits, 0 while no hit has been counted yet
    let ratios: Vec<_> = rows
        .iter()
        .map(|row| row["filter_ratio"].as_f64().unwrap_or(f64::NAN))
        .collect();
    assert_eq!(ratios.len(), 2);
    assert!(ratios.iter().zip([0.0, 0.5]).all(|(got, want)| (got - want).abs() < 1e-9), "{ratios:?}");
    assert!(rows.iter().all(|row| row["md5query"] == json!("abc123")));
    Ok(())
}
