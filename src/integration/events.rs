//! Output records for one processed video fragment.
//!
//! Field names and order are the external contract: downstream loaders read the
//! JSON arrays written by the sinks as flat records.

use chrono::{Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::tracker::PersonStatus;

/// Wall-clock format of every `*_dt` field.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifies the fragment a run processed and when it started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentInfo {
    pub filename: String,
    pub video_link: String,
    pub video_id: String,
    pub start: NaiveDateTime,
}

impl FragmentInfo {
    pub fn new(video_id: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            filename: String::new(),
            video_link: String::new(),
            video_id: video_id.into(),
            start,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_video_link(mut self, video_link: impl Into<String>) -> Self {
        self.video_link = video_link.into();
        self
    }

    /// Parse a fragment start time in `YYYY-MM-DD HH:MM:SS` form.
    pub fn parse_start(value: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value.trim(), DATETIME_FORMAT)
            .map_err(|err| Error::InvalidTimestamp(format!("{value:?}: {err}")))
    }

    /// Build fragment info from an optional start string, using the current local
    /// time when it is missing or malformed. An empty id becomes `"fragment"`.
    pub fn from_start_str_or_now(video_id: Option<&str>, start: Option<&str>) -> Self {
        let start = match start.map(Self::parse_start) {
            Some(Ok(start)) => start,
            Some(Err(err)) => {
                warn!(error = %err, "unparseable fragment start, using current time");
                Local::now().naive_local()
            }
            None => Local::now().naive_local(),
        };
        let video_id = video_id.filter(|id| !id.is_empty()).unwrap_or("fragment");
        Self::new(video_id, start)
    }

    /// Wall-clock time `offset_sec` seconds into the fragment, formatted for output.
    ///
    /// The offset is applied with microsecond precision and the result truncated
    /// to whole seconds.
    pub fn timestamp_at(&self, offset_sec: f64) -> String {
        let micros = (offset_sec * 1_000_000.0).round() as i64;
        self.start
            .checked_add_signed(TimeDelta::microseconds(micros))
            .unwrap_or(self.start)
            .format(DATETIME_FORMAT)
            .to_string()
    }
}

impl Default for FragmentInfo {
    fn default() -> Self {
        Self::new("fragment", NaiveDateTime::default())
    }
}

/// One person observation at one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonEvent {
    pub person_id: u64,
    pub filename: String,
    pub video_link: String,
    pub video_id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub start_dt: String,
    pub end_dt: String,
    pub status: PersonStatus,
    /// Always `None`: zones are not estimated
    pub zone: Option<String>,
}

impl PersonEvent {
    pub fn new(
        fragment: &FragmentInfo,
        person_id: u64,
        time_sec: f64,
        status: PersonStatus,
    ) -> Self {
        let dt = fragment.timestamp_at(time_sec);
        Self {
            person_id,
            filename: fragment.filename.clone(),
            video_link: fragment.video_link.clone(),
            video_id: fragment.video_id.clone(),
            start_sec: time_sec,
            end_sec: time_sec,
            start_dt: dt.clone(),
            end_dt: dt,
            status,
            zone: None,
        }
    }
}

/// Summary of one train track over the whole fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainEvent {
    pub train_id: u64,
    pub filename: String,
    pub video_link: String,
    pub video_id: String,
    pub arrival_sec: f64,
    pub arrival_dt: String,
    pub stop_start_sec: Option<f64>,
    pub stop_start_dt: Option<String>,
    pub stop_end_sec: Option<f64>,
    pub stop_end_dt: Option<String>,
    pub departure_sec: f64,
    pub departure_dt: String,
    pub stopped: bool,
    /// Filled in by [`associate_train_numbers`], never by the pipeline
    pub train_number: Option<String>,
}

impl TrainEvent {
    pub fn new(
        fragment: &FragmentInfo,
        train_id: u64,
        arrival_sec: f64,
        departure_sec: f64,
        stopped: bool,
    ) -> Self {
        Self {
            train_id,
            filename: fragment.filename.clone(),
            video_link: fragment.video_link.clone(),
            video_id: fragment.video_id.clone(),
            arrival_sec,
            arrival_dt: fragment.timestamp_at(arrival_sec),
            stop_start_sec: None,
            stop_start_dt: None,
            stop_end_sec: None,
            stop_end_dt: None,
            departure_sec,
            departure_dt: fragment.timestamp_at(departure_sec),
            stopped,
            train_number: None,
        }
    }
}

/// A train number read at some point of the fragment (e.g. by OCR).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainNumberSighting {
    pub number: String,
    /// Seconds from fragment start
    pub time_sec: f64,
}

/// Attach train numbers to train events by time.
///
/// Each event without a number takes the first sighting whose time falls within
/// `[arrival_sec, departure_sec]`. Returns how many events were assigned a number.
pub fn associate_train_numbers(
    events: &mut [TrainEvent],
    sightings: &[TrainNumberSighting],
) -> usize {
    let mut assigned = 0;
    for event in events.iter_mut().filter(|e| e.train_number.is_none()) {
        let hit = sightings
            .iter()
            .find(|s| (event.arrival_sec..=event.departure_sec).contains(&s.time_sec));
        if let Some(sighting) = hit {
            event.train_number = Some(sighting.number.clone());
            assigned += 1;
        }
    }
    assigned
}
