/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! geodetic position support for train tracking. Positions are plain WGS84 degrees - we don't
//! need ECEF or units-of-measure here since all consumers (wire records, marker interpolation,
//! odometers) operate on lat/lon degrees and meters

use std::fmt;
use serde::{Serialize,Deserialize};

/// mean Earth radius used for great-circle distances
pub const MEAN_EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// tolerance below which two coordinates are considered the same point (about 0.1mm)
pub const COORD_EPS: f64 = 1e-9;

/// a geographic position in geodetic degrees
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct GeoPos {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPos {
    pub fn new (lat: f64, lon: f64)->Self {
        GeoPos { lat, lon }
    }

    /// wire data can carry NaN/inf through JSON number edge cases - reject those early
    pub fn is_finite (&self)->bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn close_to (&self, other: &GeoPos)->bool {
        (self.lat - other.lat).abs() < COORD_EPS && (self.lon - other.lon).abs() < COORD_EPS
    }

    /// component-wise linear interpolation towards `to` at fraction `t` (clamped to [0,1])
    pub fn lerp (&self, to: &GeoPos, t: f64)->GeoPos {
        let t = t.clamp( 0.0, 1.0);
        GeoPos {
            lat: self.lat + (to.lat - self.lat) * t,
            lon: self.lon + (to.lon - self.lon) * t,
        }
    }

    /// great-circle distance to `other` in meters (haversine formula)
    pub fn haversine_distance_meters (&self, other: &GeoPos)->f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2( (1.0 - a).sqrt());

        MEAN_EARTH_RADIUS_METERS * c
    }
}

impl fmt::Display for GeoPos {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6},{:.6}]", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints () {
        let a = GeoPos::new( 36.80, 10.18);
        let b = GeoPos::new( 36.82, 10.20);

        assert!( a.lerp( &b, 0.0).close_to( &a));
        assert!( a.lerp( &b, 1.0).close_to( &b));
        assert!( a.lerp( &b, 2.0).close_to( &b)); // clamped

        let mid = a.lerp( &b, 0.5);
        assert!( (mid.lat - 36.81).abs() < 1e-12);
        assert!( (mid.lon - 10.19).abs() < 1e-12);
    }

    #[test]
    fn test_haversine () {
        let a = GeoPos::new( 36.80, 10.18);
        assert_eq!( a.haversine_distance_meters( &a), 0.0);

        // one degree of latitude is about 111.2 km on the 6371 km sphere
        let b = GeoPos::new( 37.80, 10.18);
        let d = a.haversine_distance_meters( &b);
        assert!( (d - 111_195.0).abs() < 100.0, "unexpected distance {d}");
    }
}
