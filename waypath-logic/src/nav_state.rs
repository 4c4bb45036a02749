use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    course::{Course, PathPoint},
    geo,
    location::{Degrees, GeoPoint, PositionFix},
    navigator::UtcDT,
    settings::NavigationSettings,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Where to go next, computed from a single fix in a single call
pub struct Guidance {
    /// The next incomplete waypoint in walking order
    pub target: PathPoint,
    pub distance_meters: f64,
    /// Absolute bearing toward the target, degrees clockwise from true north
    pub bearing_degrees: Degrees,
    /// Bearing relative to the device heading, None until a heading is known
    pub relative_bearing_degrees: Option<Degrees>,
}

#[derive(Debug, Clone)]
/// This struct handles all state updates for a walk
pub struct NavigationState {
    course: Course,

    settings: NavigationSettings,

    /// The most recent accepted fix
    latest_fix: Option<PositionFix>,

    /// The heading currently steering the compass. Orientation readings win
    /// over GPS travel headings.
    latest_heading: Option<Degrees>,

    /// Set when the orientation sensor was refused, the compass stays
    /// absolute-only for the rest of the walk
    heading_denied: bool,

    /// When the walk started
    walk_started: UtcDT,

    /// When the walk ended, if this is [Option::Some] the walk is over
    walk_ended: Option<UtcDT>,

    /// The walker's trail of accepted fixes
    pub location_history: Vec<(UtcDT, GeoPoint)>,
}

impl NavigationState {
    pub fn new(course: Course, settings: NavigationSettings) -> Self {
        Self {
            course,
            settings,
            latest_fix: None,
            latest_heading: None,
            heading_denied: false,
            walk_started: Utc::now(),
            walk_ended: None,
            location_history: Vec::with_capacity(30),
        }
    }

    /// Apply a position reading. Returns how many waypoints it newly
    /// completed. Idempotent, re-delivery of the same reading changes nothing.
    pub fn apply_fix(&mut self, fix: PositionFix) -> usize {
        if let Some(max) = self.settings.max_accuracy_meters
            && fix.accuracy_meters > max
        {
            debug!(
                "Dropping fix with accuracy {}m (limit {max}m)",
                fix.accuracy_meters
            );
            return 0;
        }

        self.location_history.push((Utc::now(), fix.point));

        // GPS travel heading only fills in while no orientation sensor spoke up
        if self.latest_heading.is_none() {
            self.latest_heading = fix.heading;
        }

        self.latest_fix = Some(fix);
        self.course
            .mark_reached(fix.point, self.settings.completion_radius_meters)
    }

    /// Apply an orientation reading, degrees clockwise from true north
    pub fn apply_heading(&mut self, heading: Degrees) {
        self.latest_heading = Some(heading);
    }

    pub fn mark_heading_denied(&mut self) {
        self.heading_denied = true;
    }

    pub fn heading_denied(&self) -> bool {
        self.heading_denied
    }

    /// Compute guidance toward the next incomplete waypoint. Distance and
    /// bearing always come from the same fix in the same call, nothing is
    /// cached across readings.
    pub fn guidance(&self) -> Option<Guidance> {
        let fix = self.latest_fix?;
        let target = self.course.next_target()?;

        let bearing = geo::bearing_degrees(fix.point, target.point);

        Some(Guidance {
            target: *target,
            distance_meters: geo::distance_meters(fix.point, target.point),
            bearing_degrees: bearing,
            relative_bearing_degrees: self
                .latest_heading
                .map(|heading| geo::relative_bearing(bearing, heading)),
        })
    }

    /// Swap in a freshly imported course, dropping all walk progress
    pub fn replace_course(&mut self, points: Vec<PathPoint>) {
        self.course.replace(points);
    }

    /// Check if the walk should end (every waypoint completed), marking the
    /// end time on the transition
    pub fn check_walk_ended(&mut self) -> bool {
        let should_end = self.course.is_complete();
        if should_end && self.walk_ended.is_none() {
            self.walk_ended = Some(Utc::now());
        }
        should_end
    }

    pub fn walk_ended(&self) -> bool {
        self.walk_ended.is_some()
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn clone_settings(&self) -> NavigationSettings {
        self.settings.clone()
    }

    pub fn as_ui_state(&self) -> NavigationUiState {
        NavigationUiState {
            points: self.course.points().to_vec(),
            completed_count: self.course.completed_count(),
            latest_fix: self.latest_fix,
            guidance: self.guidance(),
            heading: self.latest_heading,
            heading_denied: self.heading_denied,
            walk_started: self.walk_started,
            walk_ended: self.walk_ended,
        }
    }

    pub fn as_history(&self) -> WalkHistory {
        WalkHistory {
            id: Uuid::new_v4(),
            walk_started: self.walk_started,
            walk_ended: self.walk_ended.unwrap_or_default(),
            locations: self.location_history.clone(),
            completed_points: self.course.completed_count(),
            total_points: self.course.len(),
        }
    }
}

/// Subset of [NavigationState] that is meant to be sent to a UI frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationUiState {
    /// Waypoints with their completion flags, in walking order
    pub points: Vec<PathPoint>,
    pub completed_count: usize,
    /// The latest accepted fix
    pub latest_fix: Option<PositionFix>,
    /// Live guidance toward the next waypoint, None before the first fix or
    /// after the last waypoint
    pub guidance: Option<Guidance>,
    /// The heading the compass is using, degrees clockwise from true north
    pub heading: Option<Degrees>,
    /// True when the orientation sensor was refused, the compass only shows
    /// absolute bearings
    pub heading_denied: bool,
    /// When the walk started **in UTC**
    pub walk_started: UtcDT,
    /// When the walk ended, when this is Option::Some the walk is over
    pub walk_ended: Option<UtcDT>,
}

/// Record of a finished walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkHistory {
    pub id: Uuid,
    pub walk_started: UtcDT,
    pub walk_ended: UtcDT,
    /// The trail of accepted fixes over the walk
    pub locations: Vec<(UtcDT, GeoPoint)>,
    pub completed_points: usize,
    pub total_points: usize,
}
