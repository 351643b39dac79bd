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
#![allow(unused)]

//! core domain model for live train tracking: the wire record, the per-train state and the
//! fleet store that merges position updates into it. This crate is pure logic - transport
//! and fan-out live in `train_feed` and `train_server`

use std::{collections::{HashMap,VecDeque}, fmt, sync::Arc, time::Duration};
use serde::{Serialize,Deserialize};
use tracing::{debug,warn};

use train_common::datetime::EpochMillis;
use train_common::geo::GeoPos;

pub mod animator;

pub mod odometer;
use odometer::Odometer;

pub mod errors;
use errors::{Result,TrackError};

/// default number of trace points kept per train (the browser route polyline cap)
pub const DEFAULT_MAX_TRACE: usize = 50;

/* #region wire records ***************************************************************************/

/// one inbound train record as received from the feed. All fields are optional on the wire -
/// what is required for fleet tracking is checked by `valid_id()` / `position()`, not by serde
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(rename_all="camelCase")]
pub struct TrainUpdate {
    #[serde(skip_serializing_if="Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if="Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub lon: Option<f64>,

    #[serde(skip_serializing_if="Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub departure_place: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub destination_place: Option<String>,

    #[serde(skip_serializing_if="Option::is_none")]
    pub speed_factor: Option<f64>,
}

impl TrainUpdate {
    pub fn from_position (id: impl ToString, lat: f64, lon: f64)->Self {
        TrainUpdate {
            id: Some(id.to_string()),
            lat: Some(lat), lon: Some(lon),
            name: None, color: None, departure_place: None, destination_place: None,
            speed_factor: None
        }
    }

    /// the non-empty id, if there is one
    pub fn valid_id (&self)->Option<&str> {
        self.id.as_deref().filter( |id| !id.is_empty())
    }

    /// the position, if both coordinates are present and finite
    pub fn position (&self)->Option<GeoPos> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let pos = GeoPos::new( lat, lon);
                if pos.is_finite() { Some(pos) } else { None }
            }
            _ => None
        }
    }
}

/// the feed delivers either a single record or a batch of records, on two logical channels
#[derive(Debug,Deserialize)]
#[serde(untagged)]
pub enum InboundUpdate {
    Batch( Vec<TrainUpdate> ),
    Single( TrainUpdate ),
}

impl InboundUpdate {
    /// flatten into the contained records, regardless of channel
    pub fn into_records (self)->Vec<TrainUpdate> {
        match self {
            InboundUpdate::Single(upd) => vec![upd],
            InboundUpdate::Batch(upds) => upds,
        }
    }
}

/// parse an inbound JSON payload (object or array of objects)
pub fn parse_inbound (data: &str)->Result<InboundUpdate> {
    Ok( serde_json::from_str( data)? )
}

/// requests a consumer can send upstream (to the feed endpoint or the hub)
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
#[serde(tag="op", rename_all="lowercase")]
pub enum ClientRequest {
    /// replay the full fleet snapshot
    Refresh,
}

/* #endregion wire records */

/* #region train state ****************************************************************************/

/// the tracked state for one train. Descriptive metadata is first-write-sticky: once learned
/// it is not blanked out by position-only updates that lack it
#[derive(Debug,Clone,Serialize)]
#[serde(rename_all="camelCase")]
pub struct Train {
    pub id: Arc<String>, // in an Arc so that we can clone and report drops without heap allocation

    #[serde(flatten)]
    pub pos: GeoPos,

    #[serde(skip_serializing_if="Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub departure_place: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub destination_place: Option<String>,

    #[serde(skip_serializing_if="Option::is_none")]
    pub speed_factor: Option<f64>,

    pub trace: VecDeque<GeoPos>, // used as a ringbuffer to keep the recent route polyline

    pub distance_meters: Odometer,

    pub last_update: EpochMillis,
}

impl Train {
    /// first sighting of an id: store the full record, including any present metadata
    pub fn from_update (id: &str, upd: &TrainUpdate, pos: GeoPos, now: EpochMillis, max_trace: usize)->Self {
        let mut trace = VecDeque::with_capacity( max_trace);
        trace.push_back( pos);

        let mut distance_meters = Odometer::new();
        distance_meters.observe( pos);

        let mut train = Train {
            id: Arc::new( id.to_string()),
            pos,
            name: None, color: None, departure_place: None, destination_place: None,
            speed_factor: upd.speed_factor,
            trace,
            distance_meters,
            last_update: now
        };
        train.merge_metadata( upd);
        train
    }

    /// merge an update into this train: position always wins, metadata only fills empty slots
    pub fn apply (&mut self, upd: &TrainUpdate, pos: GeoPos, now: EpochMillis, max_trace: usize) {
        self.pos = pos;
        self.push_trace( pos, max_trace);
        self.distance_meters.observe( pos);
        self.merge_metadata( upd);

        if upd.speed_factor.is_some() { self.speed_factor = upd.speed_factor } // passthrough hint, latest wins

        self.last_update = now;
    }

    fn merge_metadata (&mut self, upd: &TrainUpdate) {
        set_sticky( &mut self.name, &upd.name);
        set_sticky( &mut self.color, &upd.color);
        set_sticky( &mut self.departure_place, &upd.departure_place);
        set_sticky( &mut self.destination_place, &upd.destination_place);
    }

    fn push_trace (&mut self, pos: GeoPos, max_trace: usize) {
        while self.trace.len() >= max_trace { self.trace.pop_front(); }
        self.trace.push_back( pos);
    }
}

impl fmt::Display for Train {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Train( id: {}", self.id)?;
        if let Some(name) = &self.name { write!( f, ", name: \"{name}\"")?; }
        write!( f, ", pos: {}", self.pos)?;
        if self.trace.len() > 1 { write!( f, ", n_trace: {}", self.trace.len())?; }
        write!( f, ", dist: {:.0}m", self.distance_meters.total_meters())?;
        write!( f, ", time: {})", self.last_update)
    }
}

fn is_unset (slot: &Option<String>)->bool {
    slot.as_deref().map_or( true, str::is_empty)
}

fn set_sticky (slot: &mut Option<String>, value: &Option<String>) {
    if is_unset( slot) {
        if let Some(v) = value {
            if !v.is_empty() { *slot = Some(v.clone()) }
        }
    }
}

/* #endregion train state */

/* #region fleet store ****************************************************************************/

/// what a merge did to the fleet - drives marker creation/animation downstream
#[derive(Debug,Clone,Copy,PartialEq)]
pub enum MergeOutcome {
    /// first sighting of this id
    Added( GeoPos ),
    /// known id moved to a new position
    Moved { from: GeoPos, to: GeoPos },
    /// known id reported the position it already had
    Unmoved,
    /// record unusable (no id or no valid position) - logged, nothing changed
    Rejected,
}

/// a copy-on-read view of the fleet. Handed-out snapshots are never mutated by later merges
#[derive(Debug,Clone,Serialize)]
#[serde(rename_all="camelCase")]
pub struct FleetSnapshot {
    pub timestamp: EpochMillis,
    pub trains: Vec<Train>,
}

/// the fleet: all currently tracked trains, keyed by id
pub struct TrainStore {
    trains: HashMap<String,Train>,
    max_trace: usize,
    dropped: Vec<Arc<String>>, // ids removed in the last eviction sweep
}

impl TrainStore {
    pub fn new (max_trace: usize)->Self {
        TrainStore { trains: HashMap::new(), max_trace, dropped: Vec::new() }
    }

    pub fn len (&self)->usize { self.trains.len() }
    pub fn is_empty (&self)->bool { self.trains.is_empty() }

    pub fn get (&self, id: &str)->Option<&Train> { self.trains.get( id) }

    /// merge one inbound record into the fleet. Unusable records are dropped without
    /// disturbing unrelated entries
    pub fn merge_update (&mut self, upd: &TrainUpdate, now: EpochMillis)->MergeOutcome {
        let Some(id) = upd.valid_id() else {
            debug!("ignoring update without id: {upd:?}");
            return MergeOutcome::Rejected;
        };
        let Some(pos) = upd.position() else {
            warn!("dropping update without valid position for train {id}");
            return MergeOutcome::Rejected;
        };

        match self.trains.get_mut( id) {
            Some(train) => {
                let from = train.pos;
                train.apply( upd, pos, now, self.max_trace);
                if from.close_to( &pos) {
                    MergeOutcome::Unmoved
                } else {
                    MergeOutcome::Moved { from, to: pos }
                }
            }
            None => {
                let train = Train::from_update( id, upd, pos, now, self.max_trace);
                self.trains.insert( id.to_string(), train);
                MergeOutcome::Added( pos)
            }
        }
    }

    /// a fresh deep copy of the fleet, ordered by numeric id where possible (the side
    /// list of the map client relies on a stable ordering)
    pub fn snapshot (&self, timestamp: EpochMillis)->FleetSnapshot {
        let mut trains: Vec<Train> = self.trains.values().cloned().collect();
        trains.sort_by( |a,b| id_sort_key( &a.id).cmp( &id_sort_key( &b.id)));
        FleetSnapshot { timestamp, trains }
    }

    /// the trains that changed at or after the given timestamp (the per-sweep update payload).
    /// The window is inclusive - a merge that lands within the same millisecond as the last
    /// sweep must not be lost, at worst a train is republished once
    pub fn changed_since (&self, ts: EpochMillis)->Vec<&Train> {
        let mut changed: Vec<&Train> = self.trains.values().filter( |t| t.last_update >= ts).collect();
        changed.sort_by( |a,b| id_sort_key( &a.id).cmp( &id_sort_key( &b.id)));
        changed
    }

    /// evict trains that have not reported for longer than `drop_after`, remembering the
    /// removed ids until the next `take_dropped()` so they can be reported to clients
    pub fn remove_stale (&mut self, now: EpochMillis, drop_after: Duration)->usize {
        let max_age = drop_after.as_millis() as i64;
        if max_age == 0 { return 0 } // eviction disabled

        self.dropped.clear();
        for train in self.trains.values() {
            if now.since( train.last_update) > max_age {
                self.dropped.push( train.id.clone());
            }
        }
        for id in &self.dropped {
            self.trains.remove( id.as_str());
        }

        self.dropped.len()
    }

    pub fn dropped (&self)->&[Arc<String>] { self.dropped.as_slice() }

    pub fn take_dropped (&mut self)->Vec<Arc<String>> { std::mem::take( &mut self.dropped) }
}

fn id_sort_key (id: &str)->(i64,&str) {
    (id.parse::<i64>().unwrap_or(i64::MAX), id)
}

/* #endregion fleet store */
