use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Mean Earth radius used for listing distances.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let coordinates = Self {
            latitude,
            longitude,
        };
        coordinates.validate()?;
        Ok(coordinates)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::InvalidCoordinates(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::InvalidCoordinates(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Great-circle distance between two points in miles, rounded to one decimal.
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> Result<f64, ValidationError> {
    a.validate()?;
    b.validate()?;

    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    let miles = EARTH_RADIUS_MILES * c;

    Ok((miles * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn los_angeles() -> Coordinates {
        Coordinates::new(34.0522, -118.2437).expect("valid coordinates")
    }

    #[test]
    fn identical_points_are_zero_miles_apart() {
        let la = los_angeles();
        assert_eq!(haversine_miles(la, la).expect("valid"), 0.0);

        let pole = Coordinates::new(90.0, 180.0).expect("valid coordinates");
        assert_eq!(haversine_miles(pole, pole).expect("valid"), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let la = los_angeles();
        let sf = Coordinates::new(37.7749, -122.4194).expect("valid coordinates");
        let forward = haversine_miles(la, sf).expect("valid");
        let backward = haversine_miles(sf, la).expect("valid");
        assert_eq!(forward, backward);
        assert!((forward - 347.4).abs() < 1.0, "got {forward}");
    }

    #[test]
    fn fifty_miles_north_of_los_angeles() {
        let la = los_angeles();
        let north = Coordinates::new(34.7765, -118.2437).expect("valid coordinates");
        let miles = haversine_miles(la, north).expect("valid");
        assert!((miles - 50.0).abs() <= 0.1, "got {miles}");
    }

    #[test]
    fn result_is_rounded_to_one_decimal() {
        let la = los_angeles();
        let nearby = Coordinates::new(34.0622, -118.2537).expect("valid coordinates");
        let miles = haversine_miles(la, nearby).expect("valid");
        assert_eq!((miles * 10.0).round() / 10.0, miles);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(matches!(
            Coordinates::new(91.0, 0.0),
            Err(ValidationError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, -180.5),
            Err(ValidationError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            Coordinates::new(f64::NAN, 0.0),
            Err(ValidationError::InvalidCoordinates(_))
        ));

        let bogus = Coordinates {
            latitude: 120.0,
            longitude: 0.0,
        };
        assert!(haversine_miles(los_angeles(), bogus).is_err());
    }
}
