//! SQL builders for the PoWA performance history of a PostgreSQL cluster.
//!
//! The statistics themselves are maintained server side in
//! `powa_*_history` (bucketed arrays of samples) and `powa_*_current`
//! (latest sample) tables. This crate only composes the queries reading
//! them: whole-window deltas, systematically sampled rate series and
//! predicate filter ratios.

pub mod error;
pub mod pg;
pub mod sql;
pub mod views;

pub use error::{Error, Result};
pub use sql::{Params, Select};
pub use views::{SampleMode, View};
