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

//! the outward-facing hub: merges feed records into the fleet store, animates marker motion
//! and pushes snapshots, updates and interpolated marker frames to map clients over websockets

use std::{net::SocketAddr, time::Duration};
use serde::{Serialize,Deserialize,ser::{Serializer,SerializeStruct}};

use train_feed::FeedConfig;

pub mod hub;

pub mod errors;
use errors::{Result,ServerError};

/// where and how the hub serves its clients
#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct ServerConfig {
    pub sock_addr: SocketAddr,
    pub name: String, // route prefix, e.g. "train" -> /train/ws, /train/trains
}

impl ServerConfig {
    pub fn url (&self)->String {
        format!("http://{}", self.sock_addr)
    }
}

/// fleet tracking parameters
#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct TrackConfig {
    pub max_trace: usize, // trace points kept per train
    pub drop_after: Duration, // evict trains silent for longer than this (zero disables)
    pub update_interval: Duration, // eviction sweep and update broadcast cadence
    pub frame_interval: Duration, // marker animation sampling cadence
    pub move_duration: Duration, // duration of one marker move
}

impl Default for TrackConfig {
    fn default ()->Self {
        TrackConfig {
            max_trace: train_track::DEFAULT_MAX_TRACE,
            drop_after: Duration::from_secs(300),
            update_interval: Duration::from_secs(1),
            frame_interval: Duration::from_millis(33),
            move_duration: Duration::from_millis(1000),
        }
    }
}

/// the combined config of the `train_server` binary
#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct TrainServerConfig {
    pub server: ServerConfig,

    #[serde(default)]
    pub track: TrackConfig,

    pub feed: FeedConfig,
}

/// JSON envelope for messages pushed to map clients: `{"mod": <js module>, <payload name>: <payload>}`.
/// The client dispatches on "mod" and the payload field name
pub struct WsMsg<T> where T: Serialize {
    pub js_module: &'static str,
    pub payload_name: &'static str,
    pub payload: T,
}

impl<T> WsMsg<T> where T: Serialize {
    pub fn new (js_module: &'static str, payload_name: &'static str, payload: T)->Self {
        WsMsg { js_module, payload_name, payload }
    }

    pub fn to_json (&self)->Result<String> {
        Ok( serde_json::to_string( &self)? )
    }
}

impl<T> Serialize for WsMsg<T> where T: Serialize {
    fn serialize<S> (&self, serializer: S) -> std::result::Result<S::Ok, S::Error> where S: Serializer {
        let mut state = serializer.serialize_struct( "WsMsg", 2)?;
        state.serialize_field( "mod", self.js_module)?;
        state.serialize_field( self.payload_name, &self.payload)?;
        state.end()
    }
}
