//! Destinations for the two event lists of a run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;

use super::{FragmentInfo, PersonEvent, TrainEvent};

/// Where a sink put its output, when it writes to files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkOutcome {
    pub people_path: Option<PathBuf>,
    pub trains_path: Option<PathBuf>,
}

/// Receives the person and train event lists of one fragment.
///
/// Sinks must accept empty lists: a fail-soft run still writes well-formed output.
pub trait EventSink {
    fn write(
        &mut self,
        fragment: &FragmentInfo,
        people: &[PersonEvent],
        trains: &[TrainEvent],
    ) -> Result<SinkOutcome>;
}

/// Writes `people_events_{video_id}.json` and `train_events_{video_id}.json`
/// into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    out_dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn people_path(&self, video_id: &str) -> PathBuf {
        self.out_dir.join(format!("people_events_{video_id}.json"))
    }

    pub fn trains_path(&self, video_id: &str) -> PathBuf {
        self.out_dir.join(format!("train_events_{video_id}.json"))
    }
}

fn write_json_array<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

impl EventSink for JsonDirSink {
    fn write(
        &mut self,
        fragment: &FragmentInfo,
        people: &[PersonEvent],
        trains: &[TrainEvent],
    ) -> Result<SinkOutcome> {
        fs::create_dir_all(&self.out_dir)?;

        let people_path = self.people_path(&fragment.video_id);
        let trains_path = self.trains_path(&fragment.video_id);
        write_json_array(&people_path, people)?;
        write_json_array(&trains_path, trains)?;

        info!(
            people = people.len(),
            trains = trains.len(),
            dir = %self.out_dir.display(),
            "wrote event files"
        );

        Ok(SinkOutcome {
            people_path: Some(people_path),
            trains_path: Some(trains_path),
        })
    }
}

/// Keeps events in memory, appending across writes.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub people: Vec<PersonEvent>,
    pub trains: Vec<TrainEvent>,
    pub writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MemorySink {
    fn write(
        &mut self,
        _fragment: &FragmentInfo,
        people: &[PersonEvent],
        trains: &[TrainEvent],
    ) -> Result<SinkOutcome> {
        self.people.extend_from_slice(people);
        self.trains.extend_from_slice(trains);
        self.writes += 1;
        Ok(SinkOutcome::default())
    }
}
