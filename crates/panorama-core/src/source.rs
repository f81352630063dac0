use serde::{Deserialize, Serialize};

use crate::Raster;

/// Location a photograph was taken at, in signed decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTag {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above sea level, when the camera recorded it.
    #[serde(default)]
    pub altitude: Option<f64>,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum GeoTagError {
    #[error("geotag out of range (latitude={latitude}, longitude={longitude})")]
    OutOfRange { latitude: f64, longitude: f64 },
}

impl GeoTag {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoTagError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(GeoTagError::OutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
            altitude: None,
        })
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude.is_finite().then_some(altitude);
        self
    }
}

/// One input photograph.
///
/// `index` is the position in the caller's input ordering and is what every
/// later stage (placements, boundary map, lookups) reports back.
#[derive(Clone, Debug)]
pub struct SourceImage {
    index: usize,
    raster: Raster,
    geotag: Option<GeoTag>,
}

impl SourceImage {
    pub fn new(index: usize, raster: Raster) -> Self {
        Self {
            index,
            raster,
            geotag: None,
        }
    }

    pub fn with_geotag(mut self, geotag: GeoTag) -> Self {
        self.geotag = Some(geotag);
        self
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    #[inline]
    pub fn geotag(&self) -> Option<&GeoTag> {
        self.geotag.as_ref()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.raster.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.raster.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geotag_validates_ranges() {
        assert!(GeoTag::new(47.37, 8.54).is_ok());
        assert!(GeoTag::new(-90.0, 180.0).is_ok());
        assert!(GeoTag::new(90.5, 0.0).is_err());
        assert!(GeoTag::new(0.0, -181.0).is_err());
        assert!(GeoTag::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn geotag_round_trips_through_json() {
        let tag = GeoTag::new(12.5, -71.25).expect("valid").with_altitude(340.0);
        let json = serde_json::to_string(&tag).expect("serialize");
        let back: GeoTag = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, tag);

        let bare: GeoTag =
            serde_json::from_str(r#"{"latitude":1.0,"longitude":2.0}"#).expect("deserialize");
        assert_eq!(bare.altitude, None);
    }
}
