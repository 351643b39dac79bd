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

//! smooth marker movement between position updates. Each move is a linear interpolation from
//! the marker's current rendered position to the new target, sampled by the caller at display
//! frame cadence via `advance()`. A new move for the same marker supersedes the running one
//! (last-write-wins, no queueing) - stale tasks are filtered by a per-marker generation so
//! two interpolations can never fight over the same marker

use std::{collections::HashMap, sync::Arc, time::Duration};
use serde::Serialize;

use train_common::datetime::EpochMillis;
use train_common::geo::GeoPos;

/// the fixed duration of one marker move unless configured otherwise
pub const DEFAULT_MOVE_DURATION: Duration = Duration::from_millis(1000);

/// one in-flight marker move. Ephemeral - superseded by the next `start_move` for the same marker
#[derive(Debug,Clone,Copy)]
struct AnimationTask {
    generation: u64,
    from: GeoPos,
    to: GeoPos,
    start: EpochMillis,
    duration_millis: i64,
}

impl AnimationTask {
    /// position at elapsed fraction t = min(elapsed/duration, 1), no easing
    fn sample (&self, now: EpochMillis)->(GeoPos,bool) {
        let elapsed = now.since( self.start).max(0) as f64;
        let t = (elapsed / self.duration_millis as f64).min( 1.0);
        (self.from.lerp( &self.to, t), t >= 1.0)
    }
}

#[derive(Debug)]
struct MarkerState {
    id: Arc<String>,
    rendered: GeoPos,  // what is currently shown, possibly mid-interpolation
    generation: u64,   // bumped on every start_move, cancels older tasks
    task: Option<AnimationTask>,
}

impl MarkerState {
    fn new (id: &Arc<String>, rendered: GeoPos)->Self {
        MarkerState { id: id.clone(), rendered, generation: 0, task: None }
    }
}

/// one sampled frame for one marker
#[derive(Debug,Clone,Serialize)]
#[serde(rename_all="camelCase")]
pub struct MarkerFrame {
    pub id: Arc<String>,

    #[serde(flatten)]
    pub pos: GeoPos,

    pub done: bool,
}

/// tracks rendered marker positions and drives their interpolated movement
pub struct MarkerAnimator {
    markers: HashMap<String,MarkerState>,
}

impl MarkerAnimator {
    pub fn new ()->Self {
        MarkerAnimator { markers: HashMap::new() }
    }

    /// place a marker without animation (first sighting), cancelling any running move
    pub fn set_position (&mut self, id: &Arc<String>, pos: GeoPos) {
        match self.markers.get_mut( id.as_str()) {
            Some(marker) => {
                marker.rendered = pos;
                marker.generation += 1;
                marker.task = None;
            }
            None => {
                self.markers.insert( id.to_string(), MarkerState::new( id, pos));
            }
        }
    }

    /// start moving a marker from its current rendered position to `to`. Returns false if
    /// no animation was started: unknown markers are placed directly and a coordinate-equal
    /// target is a no-op that produces zero frames
    pub fn start_move (&mut self, id: &Arc<String>, to: GeoPos, duration: Duration, now: EpochMillis)->bool {
        let Some(marker) = self.markers.get_mut( id.as_str()) else {
            self.markers.insert( id.to_string(), MarkerState::new( id, to));
            return false;
        };

        marker.generation += 1; // invalidates the continuation of any running task

        if marker.rendered.close_to( &to) {
            marker.rendered = to;
            marker.task = None;
            return false;
        }

        marker.task = Some( AnimationTask {
            generation: marker.generation,
            from: marker.rendered,
            to,
            start: now,
            duration_millis: duration.as_millis().max(1) as i64,
        });
        true
    }

    /// sample all running moves at `now`, updating rendered positions. Finished moves land
    /// exactly on their target and are retired. Returns one frame per live move - empty when
    /// nothing is animating, so idle fleets cause no frame churn
    pub fn advance (&mut self, now: EpochMillis)->Vec<MarkerFrame> {
        let mut frames = Vec::new();

        for marker in self.markers.values_mut() {
            let Some(task) = &marker.task else { continue };

            // a task that lost the generation race must not advance the marker
            if task.generation != marker.generation {
                marker.task = None;
                continue;
            }

            let (pos, done) = task.sample( now);
            marker.rendered = pos;
            if done { marker.task = None }

            frames.push( MarkerFrame { id: marker.id.clone(), pos, done });
        }

        frames.sort_by( |a,b| a.id.cmp( &b.id));
        frames
    }

    pub fn rendered_position (&self, id: &str)->Option<GeoPos> {
        self.markers.get( id).map( |m| m.rendered)
    }

    pub fn is_animating (&self)->bool {
        self.markers.values().any( |m| m.task.is_some())
    }

    pub fn remove (&mut self, id: &str) {
        self.markers.remove( id);
    }

    pub fn len (&self)->usize { self.markers.len() }
}
