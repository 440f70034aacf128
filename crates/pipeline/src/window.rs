//! Analysis window: a half-open date range `[start, end)`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date range used to filter time-indexed collections.
///
/// Serialized as `{ start: "2023-06-01", end: "2023-10-31" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct AnalysisWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl AnalysisWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidWindow(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from `YYYY-MM-DD`.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// June through October 2023, shared by every temporal preset
    pub const FLOOD_SEASON_2023: Self = Self {
        start: ymd(2023, 6, 1),
        end: ymd(2023, 10, 31),
    };

    pub const fn flood_season_2023() -> Self {
        Self::FLOOD_SEASON_2023
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `start <= date < end`
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Start bound as written in the config
    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for AnalysisWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_str(), self.end_str())
    }
}

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|e| PipelineError::InvalidWindow(format!("{text:?}: {e}")))
}

#[derive(Serialize, Deserialize)]
struct RawWindow {
    start: String,
    end: String,
}

impl TryFrom<RawWindow> for AnalysisWindow {
    type Error = PipelineError;

    fn try_from(raw: RawWindow) -> Result<Self> {
        Self::parse(&raw.start, &raw.end)
    }
}

impl From<AnalysisWindow> for RawWindow {
    fn from(w: AnalysisWindow) -> Self {
        Self {
            start: w.start_str(),
            end: w.end_str(),
        }
    }
}
