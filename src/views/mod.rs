//! Query constructors for the PoWA statistics history.
//!
//! Every constructor is a pure function returning a fresh [`Select`] with
//! named placeholders, to be bound with [`crate::sql::Params`].

pub mod history;
pub mod qualstats;
pub mod sample;
pub mod statements;

pub use history::WindowBounds;
pub use qualstats::{qualstat_getstatdata, qualstat_getstatdata_sample};
pub use sample::{SampleMode, getstatdata_sample};
pub use statements::{getstatdata_db, getstatdata_detailed_db};

use crate::{error::Error, sql::Select};
use std::{fmt, str::FromStr};

/// The views exposed by this crate, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    DetailedDb,
    Db,
    Sample(SampleMode),
    QualSample,
    Qual,
}

impl View {
    pub const NAMES: [&'static str; 5] = ["detailed-db", "db", "sample", "qual-sample", "qual"];

    /// Resolves a view name, `mode` only matters for `sample`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownView`] or, for `sample`, [`Error::UnsupportedMode`].
    pub fn resolve(name: &str, mode: &str) -> Result<Self, Error> {
        match name {
            "sample" => Ok(Self::Sample(mode.parse()?)),
            other => other.parse(),
        }
    }

    #[must_use]
    pub fn select(self) -> Select {
        match self {
            Self::DetailedDb => getstatdata_detailed_db(),
            Self::Db => getstatdata_db(),
            Self::Sample(mode) => getstatdata_sample(mode),
            Self::QualSample => qualstat_getstatdata_sample(),
            Self::Qual => qualstat_getstatdata(),
        }
    }
}

impl FromStr for View {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "detailed-db" => Ok(Self::DetailedDb),
            "db" => Ok(Self::Db),
            "sample" => Ok(Self::Sample(SampleMode::Db)),
            "qual-sample" => Ok(Self::QualSample),
            "qual" => Ok(Self::Qual),
            other => Err(Error::UnknownView(other.to_string())),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DetailedDb => f.write_str("detailed-db"),
            Self::Db => f.write_str("db"),
            Self::Sample(mode) => write!(f, "sample({mode})"),
            Self::QualSample => f.write_str("qual-sample"),
            Self::Qual => f.write_str("qual"),
        }
    }
}
