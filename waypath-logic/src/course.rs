use serde::{Deserialize, Serialize};

use crate::{
    geo,
    location::{GeoPoint, Locatable},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// One waypoint of an imported course
pub struct PathPoint {
    pub id: u64,
    pub point: GeoPoint,
    /// 0-based position in the walking order
    pub order: u32,
    /// Set once the walker has come within the completion radius, never unset
    pub completed: bool,
}

impl PathPoint {
    pub fn new(id: u64, point: GeoPoint, order: u32) -> Self {
        Self {
            id,
            point,
            order,
            completed: false,
        }
    }
}

impl Locatable for PathPoint {
    fn geo_point(&self) -> GeoPoint {
        self.point
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// An ordered set of waypoints to walk. Points are only ever replaced in bulk,
/// re-importing drops all previous progress.
pub struct Course {
    points: Vec<PathPoint>,
}

impl Course {
    pub fn new(points: Vec<PathPoint>) -> Self {
        let mut course = Self::default();
        course.replace(points);
        course
    }

    /// Swap in a freshly imported set of waypoints
    pub fn replace(&mut self, mut points: Vec<PathPoint>) {
        points.sort_by_key(|p| p.order);
        self.points = points;
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The next incomplete waypoint in walking order
    pub fn next_target(&self) -> Option<&PathPoint> {
        self.points.iter().find(|p| !p.completed)
    }

    /// Mark every waypoint within `radius_meters` of `point` as completed.
    /// Returns how many flipped. Idempotent, re-delivering the same reading
    /// changes nothing.
    pub fn mark_reached(&mut self, point: GeoPoint, radius_meters: f64) -> usize {
        let mut flipped = 0;

        for waypoint in self.points.iter_mut().filter(|p| !p.completed) {
            if geo::distance_meters(point, waypoint.point) <= radius_meters {
                waypoint.completed = true;
                flipped += 1;
            }
        }

        flipped
    }

    pub fn completed_count(&self) -> usize {
        self.points.iter().filter(|p| p.completed).count()
    }

    /// Whether the whole course has been walked. An empty course is never
    /// complete, there is nothing to walk.
    pub fn is_complete(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|p| p.completed)
    }
}
