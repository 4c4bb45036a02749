use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// A "part" of a coordinate, decimal degrees
pub type Degrees = f64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Some point in the world as gotten from a Geolocation API or an imported course
pub struct GeoPoint {
    /// Latitude, -90..90
    pub latitude: Degrees,
    /// Longitude, -180..180
    pub longitude: Degrees,
}

impl GeoPoint {
    pub fn new(latitude: Degrees, longitude: Degrees) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A single reading from a positioning sensor
pub struct PositionFix {
    pub point: GeoPoint,
    /// Accuracy radius reported by the sensor, in meters
    pub accuracy_meters: f64,
    /// Direction of travel in degrees clockwise from north, optional as GPS can't always
    /// determine it
    pub heading: Option<Degrees>,
}

impl PositionFix {
    pub fn new(point: GeoPoint, accuracy_meters: f64) -> Self {
        Self {
            point,
            accuracy_meters,
            heading: None,
        }
    }
}

/// Anything that sits at a point on the map, lets [crate::geo::nearest] scan any collection
pub trait Locatable {
    fn geo_point(&self) -> GeoPoint;
}

impl Locatable for GeoPoint {
    fn geo_point(&self) -> GeoPoint {
        *self
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A single delivery from a [SensorSource]
pub enum SensorUpdate<T> {
    /// A new reading from the sensor
    Reading(T),
    /// The user denied permission for this sensor, no readings will follow
    PermissionDenied,
    /// The source was stopped, this represents a success state as the stop was
    /// triggered by user action
    Ended,
    /// The source encountered a critical error and needs to stop
    Error(String),
}

/// A continuous stream of sensor readings with an explicit start/stop lifecycle.
/// Readings are delivered in batches, in the order the sensor produced them.
pub trait SensorSource<T>: Send + Sync {
    /// Begin watching the sensor. This is expected to spawn a job that delivers
    /// updates until stopped or an error occurs. Fails when the sensor is
    /// unavailable up front.
    fn start(&self) -> impl Future<Output = Result> + Send {
        async { Ok(()) }
    }
    /// Receive all updates since the last call, waiting until at least one is available
    fn recv_updates(&self) -> impl Future<Output = impl Iterator<Item = SensorUpdate<T>>>;
    /// Stop watching and release the underlying subscription
    fn stop(&self) -> impl Future<Output = ()> {
        async {}
    }
}
