//! Semantic status heuristics derived from track observations.
//!
//! The thresholds here are uncalibrated rules of thumb. They do not account for
//! camera resolution, distance or frame rate and are exposed as configuration so
//! they can be tuned per installation.

use std::fmt;

use nalgebra::distance;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tracker::track::{Observation, Track};

/// Thresholds for the person and train status heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Center speed in px/s at or below which a person is stationary
    pub walking_speed_threshold: f64,
    /// Area spread relative to mean area below which a train is stopped
    pub stopped_area_spread: f64,
    /// Floor for the mean area used as the spread denominator
    pub min_area_denominator: f64,
    /// Smallest time delta used for speed, in seconds
    pub time_epsilon: f64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            walking_speed_threshold: 2.0,
            stopped_area_spread: 0.1,
            min_area_denominator: 1.0,
            time_epsilon: 1e-6,
        }
    }
}

impl StatusConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("walking_speed_threshold", self.walking_speed_threshold),
            ("stopped_area_spread", self.stopped_area_spread),
            ("min_area_denominator", self.min_area_denominator),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !self.time_epsilon.is_finite() || self.time_epsilon <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "time_epsilon must be finite and positive, got {}",
                self.time_epsilon
            )));
        }
        if self.min_area_denominator == 0.0 {
            return Err(Error::InvalidConfig(
                "min_area_denominator must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonStatus {
    Stationary,
    Walking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainStatus {
    Arriving,
    Stopped,
    Departing,
}

impl fmt::Display for PersonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PersonStatus::Stationary => "Stationary",
            PersonStatus::Walking => "Walking",
        })
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrainStatus::Arriving => "Arriving",
            TrainStatus::Stopped => "Stopped",
            TrainStatus::Departing => "Departing",
        })
    }
}

/// Classify a person from the center speed between two observations.
///
/// Without a previous observation the person is `Stationary`. The time delta is
/// clamped to `time_epsilon`, so equal or out-of-order timestamps never divide by zero.
pub fn person_status(
    previous: Option<Observation>,
    current: Observation,
    config: &StatusConfig,
) -> PersonStatus {
    let Some(previous) = previous else {
        return PersonStatus::Stationary;
    };

    let dt = (current.time_sec - previous.time_sec).max(config.time_epsilon);
    let moved = distance(
        &previous.bbox.center().cast::<f64>(),
        &current.bbox.center().cast::<f64>(),
    );
    let speed = moved / dt;

    if speed <= config.walking_speed_threshold {
        PersonStatus::Stationary
    } else {
        PersonStatus::Walking
    }
}

/// Classify a train from how stable its box area is across its history.
///
/// With at most one observation the train is `Arriving`. Otherwise a spread of
/// `max - min` area below `stopped_area_spread` of the mean means `Stopped`, and
/// anything else `Departing`.
pub fn train_status(track: &Track, config: &StatusConfig) -> TrainStatus {
    let history = track.history();
    if history.len() <= 1 {
        return TrainStatus::Arriving;
    }

    let areas: Array1<f64> = history.iter().map(|obs| obs.bbox.area() as f64).collect();
    let mean = areas.mean().unwrap_or(0.0);
    let max = areas.fold(f64::MIN, |acc, &a| acc.max(a));
    let min = areas.fold(f64::MAX, |acc, &a| acc.min(a));

    if (max - min) / mean.max(config.min_area_denominator) < config.stopped_area_spread {
        TrainStatus::Stopped
    } else {
        TrainStatus::Departing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::bbox::BoundingBox;
    use crate::tracker::matching::ObjectKind;

    fn obs(t: f64, x: f32, y: f32) -> Observation {
        Observation::new(t, BoundingBox::new(x, y, 20.0, 20.0))
    }

    fn train_with_widths(widths: &[f32]) -> Track {
        let first = BoundingBox::new(0.0, 0.0, widths[0], 100.0);
        let mut track = Track::new(1, ObjectKind::Train, first, 0.0);
        track.record_observation();
        for (i, &w) in widths.iter().enumerate().skip(1) {
            track.update(BoundingBox::new(0.0, 0.0, w, 100.0), i as f64);
            track.record_observation();
        }
        track
    }

    #[test]
    fn test_person_without_history_is_stationary() {
        let config = StatusConfig::default();
        assert_eq!(person_status(None, obs(0.0, 0.0, 0.0), &config), PersonStatus::Stationary);
    }

    #[test]
    fn test_person_walking() {
        let config = StatusConfig::default();
        let status = person_status(Some(obs(0.0, 0.0, 0.0)), obs(1.0, 100.0, 0.0), &config);
        assert_eq!(status, PersonStatus::Walking);
    }

    #[test]
    fn test_person_speed_threshold_is_inclusive() {
        let config = StatusConfig::default();
        // 2 px in 1 s is exactly the threshold
        let status = person_status(Some(obs(0.0, 0.0, 0.0)), obs(1.0, 2.0, 0.0), &config);
        assert_eq!(status, PersonStatus::Stationary);

        let status = person_status(Some(obs(0.0, 0.0, 0.0)), obs(1.0, 3.0, 0.0), &config);
        assert_eq!(status, PersonStatus::Walking);
    }

    #[test]
    fn test_person_zero_time_delta_does_not_panic() {
        let config = StatusConfig::default();
        let status = person_status(Some(obs(1.0, 0.0, 0.0)), obs(1.0, 0.0, 0.0), &config);
        assert_eq!(status, PersonStatus::Stationary);

        // Any movement over a clamped delta is walking
        let status = person_status(Some(obs(2.0, 0.0, 0.0)), obs(1.0, 1.0, 0.0), &config);
        assert_eq!(status, PersonStatus::Walking);
    }

    #[test]
    fn test_train_single_observation_is_arriving() {
        let config = StatusConfig::default();
        let track = train_with_widths(&[200.0]);
        assert_eq!(train_status(&track, &config), TrainStatus::Arriving);

        let empty = Track::new(2, ObjectKind::Train, BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.0);
        assert_eq!(train_status(&empty, &config), TrainStatus::Arriving);
    }

    #[test]
    fn test_train_stable_area_is_stopped() {
        let config = StatusConfig::default();
        let track = train_with_widths(&[200.0, 202.0, 198.0, 205.0, 201.0]);
        assert_eq!(train_status(&track, &config), TrainStatus::Stopped);
    }

    #[test]
    fn test_train_changing_area_is_departing() {
        let config = StatusConfig::default();
        let track = train_with_widths(&[100.0, 150.0, 200.0]);
        assert_eq!(train_status(&track, &config), TrainStatus::Departing);
    }

    #[test]
    fn test_status_config_validation() {
        assert!(StatusConfig::default().validate().is_ok());
        let config = StatusConfig {
            time_epsilon: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = StatusConfig {
            walking_speed_threshold: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
