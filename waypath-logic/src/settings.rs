use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Settings for a navigation session
pub struct NavigationSettings {
    /// Distance at which a waypoint counts as reached, in meters
    pub completion_radius_meters: f64,
    /// Discard fixes whose reported accuracy radius is worse than this, in
    /// meters. None accepts every fix.
    pub max_accuracy_meters: Option<f64>,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            completion_radius_meters: 15.0,
            max_accuracy_meters: Some(50.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Settings for converting an SVG drawing into a GPS course
pub struct SvgImportSettings {
    /// Minimum spacing between emitted waypoints, in meters. Also sets the
    /// sampling density along each path.
    pub min_distance_meters: f64,
    /// Maximum spacing between samples, long segments get extra samples to
    /// stay under this
    pub max_distance_meters: f64,
    /// Hard cap on the total number of waypoints across the whole import
    pub max_points: usize,
    /// Multiplier from SVG units to meters before projecting
    pub svg_scale: f64,
    /// Rotation applied to the drawing around the viewBox center, degrees
    /// clockwise
    pub svg_rotation_degrees: f64,
}

impl Default for SvgImportSettings {
    fn default() -> Self {
        Self {
            min_distance_meters: 10.0,
            max_distance_meters: 50.0,
            max_points: 200,
            svg_scale: 1.0,
            svg_rotation_degrees: 0.0,
        }
    }
}
