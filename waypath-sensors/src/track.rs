use serde::{Deserialize, Serialize};

use waypath_logic::{GeoPoint, PositionFix, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One recorded sensor reading
pub struct TrackPoint {
    /// Seconds since the start of the recording
    pub offset_seconds: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius reported at this point, in meters
    #[serde(default = "default_accuracy")]
    pub accuracy_meters: f64,
    /// Compass heading at this point, when one was recorded
    #[serde(default)]
    pub heading: Option<f64>,
}

fn default_accuracy() -> f64 {
    10.0
}

impl TrackPoint {
    pub fn new(offset_seconds: f64, latitude: f64, longitude: f64) -> Self {
        Self {
            offset_seconds,
            latitude,
            longitude,
            accuracy_meters: default_accuracy(),
            heading: None,
        }
    }

    pub fn as_fix(&self) -> PositionFix {
        PositionFix {
            point: GeoPoint::new(self.latitude, self.longitude),
            accuracy_meters: self.accuracy_meters,
            heading: self.heading,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// A recorded walk, replayable as a live sensor stream. Points are kept
/// sorted by their time offset.
pub struct Track {
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(mut points: Vec<TrackPoint>) -> Self {
        points.sort_by(|a, b| a.offset_seconds.total_cmp(&b.offset_seconds));
        Self { points }
    }

    /// Parse a track fixture, a JSON array of points
    pub fn from_json(json: &str) -> Result<Self> {
        let points = serde_json::from_str::<Vec<TrackPoint>>(json)
            .context("Failed to parse track file")?;
        Ok(Self::new(points))
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
