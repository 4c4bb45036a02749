//! Loaders for the bundled point datasets.
//!
//! Each dataset ships as a JSON fixture with its own field names, so every
//! kind gets its own record type and mapping into a common [Place].

use log::{debug, warn};
use serde::Deserialize;

use crate::{
    location::{GeoPoint, Locatable},
    prelude::*,
};

#[derive(Debug, Clone, PartialEq)]
/// A dataset entry reduced to a label and a position
pub struct Place {
    pub label: String,
    pub point: GeoPoint,
}

impl Locatable for Place {
    fn geo_point(&self) -> GeoPoint {
        self.point
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The known dataset fixtures, keyed by name
pub enum DatasetKind {
    Facilities,
    Crime,
    Trees,
}

impl DatasetKind {
    pub const ALL_KINDS: [Self; 3] = [
        DatasetKind::Facilities,
        DatasetKind::Crime,
        DatasetKind::Trees,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "facilities" => Some(Self::Facilities),
            "crime" => Some(Self::Crime),
            "trees" => Some(Self::Trees),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Facilities => "facilities",
            Self::Crime => "crime",
            Self::Trees => "trees",
        }
    }

    /// Parse a dataset fixture. A fixture that doesn't parse at all logs a
    /// diagnostic and yields nothing, individual records that don't map to a
    /// usable point are skipped.
    pub fn parse(self, json: &str) -> Vec<Place> {
        match self.try_parse(json) {
            Ok(places) => places,
            Err(why) => {
                warn!("Failed to parse the {} dataset: {why:?}", self.name());
                Vec::new()
            }
        }
    }

    fn try_parse(self, json: &str) -> Result<Vec<Place>> {
        let places = match self {
            Self::Facilities => serde_json::from_str::<Vec<FacilityRecord>>(json)
                .context("Bad facilities fixture")?
                .into_iter()
                .map(FacilityRecord::into_place)
                .collect(),
            Self::Crime => serde_json::from_str::<Vec<CrimeRecord>>(json)
                .context("Bad crime fixture")?
                .into_iter()
                .filter_map(CrimeRecord::into_place)
                .collect(),
            Self::Trees => serde_json::from_str::<Vec<TreeRecord>>(json)
                .context("Bad trees fixture")?
                .into_iter()
                .map(TreeRecord::into_place)
                .collect(),
        };

        Ok(places)
    }
}

#[derive(Debug, Deserialize)]
struct FacilityRecord {
    name: String,
    latitude: f64,
    longitude: f64,
}

impl FacilityRecord {
    fn into_place(self) -> Place {
        Place {
            label: self.name,
            point: GeoPoint::new(self.latitude, self.longitude),
        }
    }
}

/// Street crime records carry their coordinates as strings, the police API
/// shape
#[derive(Debug, Deserialize)]
struct CrimeRecord {
    category: String,
    location: CrimeLocation,
}

#[derive(Debug, Deserialize)]
struct CrimeLocation {
    latitude: String,
    longitude: String,
}

impl CrimeRecord {
    fn into_place(self) -> Option<Place> {
        let latitude = self.location.latitude.parse::<f64>();
        let longitude = self.location.longitude.parse::<f64>();

        match (latitude, longitude) {
            (Ok(latitude), Ok(longitude)) => Some(Place {
                label: self.category,
                point: GeoPoint::new(latitude, longitude),
            }),
            _ => {
                debug!("Skipping crime record with unparseable coordinates");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeRecord {
    common_name: Option<String>,
    lat: f64,
    lng: f64,
}

impl TreeRecord {
    fn into_place(self) -> Place {
        Place {
            label: self.common_name.unwrap_or_else(|| "Unknown tree".to_string()),
            point: GeoPoint::new(self.lat, self.lng),
        }
    }
}
