mod replay;
mod track;

pub use replay::{JitterSettings, ReplayOptions, ReplaySource};
pub use track::{Track, TrackPoint};
