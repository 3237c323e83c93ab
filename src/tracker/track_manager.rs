//! Per-frame association of detections to tracks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::tracker::bbox::{BoundingBox, overlap_matrix};
use crate::tracker::matching::{self, Detection, ObjectKind};
use crate::tracker::track::Track;

/// Configuration for the TrackManager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackManagerConfig {
    /// Minimum overlap ratio for a detection to continue an existing track
    pub overlap_threshold: f32,
    /// Seconds without a match before a track is marked lost
    pub lost_timeout_secs: f64,
}

impl Default for TrackManagerConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.3,
            lost_timeout_secs: 5.0,
        }
    }
}

impl TrackManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(Error::InvalidConfig(format!(
                "overlap_threshold must be in [0, 1], got {}",
                self.overlap_threshold
            )));
        }
        if !self.lost_timeout_secs.is_finite() || self.lost_timeout_secs < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "lost_timeout_secs must be finite and non-negative, got {}",
                self.lost_timeout_secs
            )));
        }
        Ok(())
    }
}

/// What one `step` call did, by track id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub updated: Vec<u64>,
    pub created: Vec<u64>,
    pub lost: Vec<u64>,
    /// Malformed detections dropped before association
    pub dropped: usize,
}

/// Owns every track of one pipeline run.
///
/// Tracks are kept in ascending id order, which is also the candidate order during
/// association: when two tracks overlap a detection equally, the older one wins.
/// Ids start at 1, only ever increase, and are never reused within a manager.
#[derive(Debug, Clone)]
pub struct TrackManager {
    tracks: BTreeMap<u64, Track>,
    next_id: u64,
    config: TrackManagerConfig,
}

impl Default for TrackManager {
    fn default() -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            config: TrackManagerConfig::default(),
        }
    }
}

impl TrackManager {
    pub fn new(config: TrackManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            config,
        })
    }

    pub fn config(&self) -> &TrackManagerConfig {
        &self.config
    }

    /// Associate one frame's detections of a single `kind` and age out stale tracks.
    ///
    /// Every detection must be of `kind`; anything else is rejected before any track
    /// is touched. Malformed boxes are dropped and counted in the report.
    pub fn step(
        &mut self,
        detections: &[Detection],
        kind: ObjectKind,
        frame_time: f64,
    ) -> Result<StepReport> {
        if let Some(det) = detections.iter().find(|d| d.kind != kind) {
            return Err(Error::KindMismatch {
                expected: kind,
                found: det.kind,
            });
        }

        let mut report = StepReport::default();

        let det_boxes: Vec<BoundingBox> = detections
            .iter()
            .filter_map(|det| match det.bbox.validate() {
                Ok(()) => Some(det.bbox),
                Err(err) => {
                    warn!(%kind, frame_time, error = %err, "dropping malformed detection");
                    report.dropped += 1;
                    None
                }
            })
            .collect();

        // Step 1: Match against tracks that existed before this frame
        let candidate_ids: Vec<u64> = self
            .tracks
            .values()
            .filter(|t| t.kind() == kind)
            .map(|t| t.id())
            .collect();
        let candidate_boxes: Vec<BoundingBox> = candidate_ids
            .iter()
            .map(|id| self.tracks[id].last_bbox())
            .collect();

        let overlaps = overlap_matrix(&det_boxes, &candidate_boxes);
        let mut assigned = vec![false; candidate_ids.len()];

        for (row, bbox) in det_boxes.into_iter().enumerate() {
            let matched = matching::best_match(
                overlaps.row(row),
                &assigned,
                self.config.overlap_threshold,
            );

            match matched {
                Some(col) => {
                    assigned[col] = true;
                    let id = candidate_ids[col];
                    if let Some(track) = self.tracks.get_mut(&id) {
                        track.update(bbox, frame_time);
                    }
                    report.updated.push(id);
                }
                // Step 2: Init new tracks
                None => {
                    let id = self.next_track_id();
                    debug!(id, %kind, frame_time, "new track");
                    self.tracks.insert(id, Track::new(id, kind, bbox, frame_time));
                    report.created.push(id);
                }
            }
        }

        // Step 3: Mark stale tracks lost; they stay for final aggregation
        let timeout = self.config.lost_timeout_secs;
        for track in self.tracks.values_mut().filter(|t| t.kind() == kind) {
            let last = track.last_time();
            if last < frame_time && frame_time - last > timeout && !track.is_lost() {
                debug!(id = track.id(), %kind, frame_time, last_seen = last, "track lost");
                track.mark_lost(frame_time);
                report.lost.push(track.id());
            }
        }

        Ok(report)
    }

    fn next_track_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, id: u64) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// All tracks, lost ones included, in ascending id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn tracks_of(&self, kind: ObjectKind) -> impl Iterator<Item = &Track> {
        self.tracks.values().filter(move |t| t.kind() == kind)
    }

    pub fn tracks_of_mut(&mut self, kind: ObjectKind) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut().filter(move |t| t.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TrackManager {
        TrackManager::new(TrackManagerConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config() {
        let config = TrackManagerConfig {
            overlap_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            TrackManager::new(config),
            Err(Error::InvalidConfig(_))
        ));

        let config = TrackManagerConfig {
            lost_timeout_secs: f64::NAN,
            ..Default::default()
        };
        assert!(TrackManager::new(config).is_err());
    }

    #[test]
    fn test_same_box_continues_track() {
        let mut tm = manager();
        let det = Detection::person(10.0, 10.0, 50.0, 50.0);

        let r0 = tm.step(&[det], ObjectKind::Person, 0.0).unwrap();
        let r1 = tm.step(&[det], ObjectKind::Person, 1.0).unwrap();

        assert_eq!(r0.created, vec![1]);
        assert_eq!(r1.updated, vec![1]);
        assert!(r1.created.is_empty());
        assert_eq!(tm.len(), 1);
        assert_eq!(tm.track(1).unwrap().last_time(), 1.0);
    }

    #[test]
    fn test_low_overlap_spawns_new_track() {
        let mut tm = manager();
        tm.step(&[Detection::person(0.0, 0.0, 10.0, 10.0)], ObjectKind::Person, 0.0)
            .unwrap();

        // Overlap 25 / 175 < 0.3
        let r = tm
            .step(&[Detection::person(5.0, 5.0, 10.0, 10.0)], ObjectKind::Person, 1.0)
            .unwrap();
        assert_eq!(r.created, vec![2]);
        assert!(tm.tracks().all(|t| t.id() <= 2));
    }

    #[test]
    fn test_two_disjoint_detections_in_one_step() {
        let mut tm = manager();
        let r = tm
            .step(
                &[
                    Detection::person(0.0, 0.0, 10.0, 10.0),
                    Detection::person(100.0, 100.0, 10.0, 10.0),
                ],
                ObjectKind::Person,
                0.0,
            )
            .unwrap();
        assert_eq!(r.created, vec![1, 2]);
    }

    #[test]
    fn test_one_track_matches_only_one_detection() {
        let mut tm = manager();
        tm.step(&[Detection::person(0.0, 0.0, 10.0, 10.0)], ObjectKind::Person, 0.0)
            .unwrap();

        let r = tm
            .step(
                &[
                    Detection::person(0.0, 0.0, 10.0, 10.0),
                    Detection::person(1.0, 0.0, 10.0, 10.0),
                ],
                ObjectKind::Person,
                1.0,
            )
            .unwrap();
        assert_eq!(r.updated, vec![1]);
        assert_eq!(r.created, vec![2]);
    }

    #[test]
    fn test_equal_overlap_prefers_lower_id() {
        let mut tm = manager();
        // Detections only match tracks from earlier frames, so both become tracks
        tm.step(
            &[
                Detection::person(0.0, 0.0, 10.0, 10.0),
                Detection::person(0.0, 0.0, 10.0, 10.0),
            ],
            ObjectKind::Person,
            0.0,
        )
        .unwrap();
        assert_eq!(tm.len(), 2);

        let r = tm
            .step(&[Detection::person(0.0, 0.0, 10.0, 10.0)], ObjectKind::Person, 1.0)
            .unwrap();
        assert_eq!(r.updated, vec![1]);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut tm = manager();
        tm.step(&[Detection::person(0.0, 0.0, 10.0, 10.0)], ObjectKind::Person, 0.0)
            .unwrap();
        let r = tm
            .step(&[Detection::train(0.0, 0.0, 10.0, 10.0)], ObjectKind::Train, 0.0)
            .unwrap();

        assert_eq!(r.created, vec![2]);
        assert_eq!(tm.track(1).unwrap().kind(), ObjectKind::Person);
        assert_eq!(tm.track(2).unwrap().kind(), ObjectKind::Train);
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        let mut tm = manager();
        let err = tm
            .step(
                &[
                    Detection::person(0.0, 0.0, 10.0, 10.0),
                    Detection::train(0.0, 0.0, 10.0, 10.0),
                ],
                ObjectKind::Person,
                0.0,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::KindMismatch {
                expected: ObjectKind::Person,
                found: ObjectKind::Train
            }
        ));
        assert!(tm.is_empty());
    }

    #[test]
    fn test_malformed_detection_dropped() {
        let mut tm = manager();
        let r = tm
            .step(
                &[
                    Detection::person(f32::NAN, 0.0, 10.0, 10.0),
                    Detection::person(0.0, 0.0, 0.0, 10.0),
                    Detection::person(0.0, 0.0, 10.0, 10.0),
                ],
                ObjectKind::Person,
                0.0,
            )
            .unwrap();
        assert_eq!(r.dropped, 2);
        assert_eq!(r.created, vec![1]);
    }

    #[test]
    fn test_lost_marked_once_and_retained() {
        let mut tm = manager();
        tm.step(&[Detection::train(0.0, 0.0, 100.0, 50.0)], ObjectKind::Train, 0.0)
            .unwrap();

        // Exactly at the timeout: not yet lost
        let r = tm.step(&[], ObjectKind::Train, 5.0).unwrap();
        assert!(r.lost.is_empty());

        let r = tm.step(&[], ObjectKind::Train, 6.0).unwrap();
        assert_eq!(r.lost, vec![1]);
        assert_eq!(tm.track(1).unwrap().lost_since(), Some(6.0));

        let r = tm.step(&[], ObjectKind::Train, 7.0).unwrap();
        assert!(r.lost.is_empty());
        assert_eq!(tm.track(1).unwrap().lost_since(), Some(6.0));
        assert_eq!(tm.len(), 1);
    }

    #[test]
    fn test_lost_scan_only_touches_stepped_kind() {
        let mut tm = manager();
        tm.step(&[Detection::person(0.0, 0.0, 10.0, 10.0)], ObjectKind::Person, 0.0)
            .unwrap();
        tm.step(&[], ObjectKind::Train, 10.0).unwrap();
        assert!(!tm.track(1).unwrap().is_lost());
    }

    #[test]
    fn test_lost_track_can_be_recovered() {
        let mut tm = manager();
        let det = Detection::person(0.0, 0.0, 10.0, 10.0);
        tm.step(&[det], ObjectKind::Person, 0.0).unwrap();
        tm.step(&[], ObjectKind::Person, 6.0).unwrap();
        assert!(tm.track(1).unwrap().is_lost());

        let r = tm.step(&[det], ObjectKind::Person, 7.0).unwrap();
        assert_eq!(r.updated, vec![1]);
        assert!(!tm.track(1).unwrap().is_lost());
    }

    #[test]
    fn test_empty_step_creates_nothing() {
        let mut tm = manager();
        let r = tm.step(&[], ObjectKind::Person, 0.0).unwrap();
        assert_eq!(r, StepReport::default());
        assert!(tm.is_empty());
    }
}
