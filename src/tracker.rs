mod bbox;
mod matching;
mod status;
mod track;
mod track_manager;
mod track_state;

pub use bbox::{BoundingBox, overlap_matrix, overlap_ratio};
pub use matching::{Detection, ObjectKind, best_match, partition_by_kind};
pub use status::{PersonStatus, StatusConfig, TrainStatus, person_status, train_status};
pub use track::{Observation, Track};
pub use track_manager::{StepReport, TrackManager, TrackManagerConfig};
pub use track_state::TrackState;
