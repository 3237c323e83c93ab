use serde::{Deserialize, Serialize};

/// Track state in the tracking lifecycle.
///
/// Tracks are never removed during a run; a lost track stays in the manager so it
/// can still be summarized, and returns to `Tracked` if a detection matches it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackState {
    /// Matched within the lost timeout
    #[default]
    Tracked,
    /// Unmatched for longer than the lost timeout
    Lost,
}
