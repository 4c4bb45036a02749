mod course;
mod dataset;
mod flock;
pub mod geo;
mod location;
mod nav_state;
mod navigator;
mod settings;
mod svg_import;
#[cfg(test)]
mod tests;

pub use course::{Course, PathPoint};
pub use dataset::{DatasetKind, Place};
pub use flock::{Boid, Flock, FlockSettings, Vec2};
pub use location::{Degrees, GeoPoint, Locatable, PositionFix, SensorSource, SensorUpdate};
pub use nav_state::{Guidance, NavigationState, NavigationUiState, WalkHistory};
pub use navigator::{Navigator, StateUpdateSender, UtcDT};
pub use settings::{NavigationSettings, SvgImportSettings};
pub use svg_import::import_course;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
