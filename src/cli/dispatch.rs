use crate::cli::{actions::Action, config::Config, output::Format, time::parse_time};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::ArgMatches;
use powa_sql::{Params, View};
use std::path::PathBuf;

const DEFAULT_SAMPLES: i64 = 100;

pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let config = Config::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    let view_name = matches
        .get_one::<String>("view")
        .context("missing view")?;
    let mode = matches
        .get_one::<String>("mode")
        .map_or("db", String::as_str);
    let view = View::resolve(view_name, mode)?;

    let now = Utc::now();
    let from = parse_time(
        matches.get_one::<String>("from").map_or("-1h", String::as_str),
        now,
    )?;
    let to = parse_time(
        matches.get_one::<String>("to").map_or("now", String::as_str),
        now,
    )?;
    let samples = matches
        .get_one::<i64>("samples")
        .copied()
        .or(config.samples)
        .unwrap_or(DEFAULT_SAMPLES);

    let mut params = Params::window(from, to)?.with_samples(samples)?;
    if let Some(query) = matches.get_one::<String>("query") {
        params = params.with_query(query.clone());
    }

    let dsn = matches.get_one::<String>("dsn").cloned().or(config.dsn);
    let format = match matches.get_one::<String>("format").or(config.format.as_ref()) {
        Some(name) => name.parse()?,
        None if dsn.is_some() => Format::Json,
        None => Format::Sql,
    };
    let validate = matches.get_flag("validate");

    if !format.needs_rows() {
        return Ok(Action::Render {
            view,
            format,
            validate,
        });
    }

    let Some(dsn) = dsn else {
        bail!("--format {format} needs a DSN (--dsn or POWA_DSN)");
    };

    Ok(Action::Fetch {
        view,
        dsn,
        params,
        format,
        validate,
    })
}
