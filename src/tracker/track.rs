//! Single tracked entity and its observation history.

use serde::Serialize;

use crate::tracker::bbox::BoundingBox;
use crate::tracker::matching::ObjectKind;
use crate::tracker::track_state::TrackState;

/// One recorded observation of a track, in seconds from fragment start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub time_sec: f64,
    pub bbox: BoundingBox,
}

impl Observation {
    pub fn new(time_sec: f64, bbox: BoundingBox) -> Self {
        Self { time_sec, bbox }
    }
}

/// A continuously observed person or train.
///
/// The id and kind are fixed at creation. `history` is append-only and is filled by
/// the pipeline, not by association: the manager only moves `last_bbox`/`last_time`.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    id: u64,
    kind: ObjectKind,
    last_bbox: BoundingBox,
    last_time: f64,
    start_time: f64,
    state: TrackState,
    lost_since: Option<f64>,
    history: Vec<Observation>,
}

impl Track {
    /// Create a new track seeded with its first detection.
    pub fn new(id: u64, kind: ObjectKind, bbox: BoundingBox, time_sec: f64) -> Self {
        Self {
            id,
            kind,
            last_bbox: bbox,
            last_time: time_sec,
            start_time: time_sec,
            state: TrackState::Tracked,
            lost_since: None,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn last_bbox(&self) -> BoundingBox {
        self.last_bbox
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_lost(&self) -> bool {
        self.state == TrackState::Lost
    }

    pub fn lost_since(&self) -> Option<f64> {
        self.lost_since
    }

    pub fn history(&self) -> &[Observation] {
        &self.history
    }

    /// Move the track to a newly matched detection. Clears any lost state.
    pub fn update(&mut self, bbox: BoundingBox, time_sec: f64) {
        self.last_bbox = bbox;
        self.last_time = time_sec;
        self.state = TrackState::Tracked;
        self.lost_since = None;
    }

    pub fn mark_lost(&mut self, time_sec: f64) {
        self.state = TrackState::Lost;
        self.lost_since = Some(time_sec);
    }

    /// Whether the last association happened at exactly `time_sec`.
    ///
    /// Sample times are derived from the same frame index arithmetic on both sides,
    /// so exact comparison is intended.
    pub fn seen_at(&self, time_sec: f64) -> bool {
        self.last_time == time_sec
    }

    /// Append the current `(last_time, last_bbox)` to the history.
    ///
    /// Returns the entry that was last before this append, if any.
    pub fn record_observation(&mut self) -> Option<Observation> {
        let previous = self.history.last().copied();
        self.history
            .push(Observation::new(self.last_time, self.last_bbox));
        previous
    }

    /// Earliest and latest recorded observation times.
    pub fn observed_span(&self) -> Option<(f64, f64)> {
        self.history.iter().fold(None, |span, obs| match span {
            None => Some((obs.time_sec, obs.time_sec)),
            Some((lo, hi)) => Some((lo.min(obs.time_sec), hi.max(obs.time_sec))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(10.0, 10.0, 50.0, 50.0)
    }

    #[test]
    fn test_new_track() {
        let track = Track::new(7, ObjectKind::Person, bbox(), 3.0);
        assert_eq!(track.id(), 7);
        assert_eq!(track.kind(), ObjectKind::Person);
        assert_eq!(track.start_time(), 3.0);
        assert_eq!(track.last_time(), 3.0);
        assert!(!track.is_lost());
        assert!(track.history().is_empty());
        assert_eq!(track.observed_span(), None);
    }

    #[test]
    fn test_update_clears_lost() {
        let mut track = Track::new(1, ObjectKind::Train, bbox(), 0.0);
        track.mark_lost(6.0);
        assert!(track.is_lost());
        assert_eq!(track.lost_since(), Some(6.0));

        track.update(BoundingBox::new(12.0, 10.0, 50.0, 50.0), 7.0);
        assert_eq!(track.state(), TrackState::Tracked);
        assert_eq!(track.lost_since(), None);
        assert_eq!(track.last_time(), 7.0);
        assert_eq!(track.start_time(), 0.0);
    }

    #[test]
    fn test_record_observation_returns_previous() {
        let mut track = Track::new(1, ObjectKind::Person, bbox(), 0.0);
        assert_eq!(track.record_observation(), None);

        track.update(BoundingBox::new(20.0, 10.0, 50.0, 50.0), 1.0);
        let prev = track.record_observation().unwrap();
        assert_eq!(prev.time_sec, 0.0);
        assert_eq!(prev.bbox, bbox());
        assert_eq!(track.history().len(), 2);
        assert_eq!(track.observed_span(), Some((0.0, 1.0)));
    }
}
