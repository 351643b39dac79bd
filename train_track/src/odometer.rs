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

use serde::{Serialize,Serializer};

use train_common::geo::GeoPos;

/// accumulated great-circle distance over successive position observations. Purely cosmetic
/// fleet statistic - monotonically non-decreasing, reset only by process restart
#[derive(Debug,Clone,Default)]
pub struct Odometer {
    total_meters: f64,
    last: Option<GeoPos>,
}

impl Odometer {
    pub fn new ()->Self {
        Odometer::default()
    }

    /// add the leg from the previous observation, returning the meters added
    pub fn observe (&mut self, pos: GeoPos)->f64 {
        let leg = match &self.last {
            Some(last) => last.haversine_distance_meters( &pos),
            None => 0.0
        };
        self.total_meters += leg;
        self.last = Some(pos);
        leg
    }

    pub fn total_meters (&self)->f64 { self.total_meters }
}

// on the wire an odometer is just its total
impl Serialize for Odometer {
    fn serialize<S> (&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        serializer.serialize_f64( self.total_meters)
    }
}
