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

//! WebSocket transport client for live train position updates. The connection loop owns
//! reconnection (fixed delay, attempts cannot stack) - an explicit `disconnect()` suppresses
//! auto-reconnect until the feed is re-armed with `start()`

use std::{sync::Arc, time::Duration};
use serde::{Serialize,Deserialize};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::debug;

use train_track::{ClientRequest,TrainUpdate};

mod ws;
use ws::ws_loop;

pub mod errors;
use errors::{FeedError,Result};

/// buffered events per subscriber before it starts lagging
const EVENT_QUEUE_LEN: usize = 256;
const CMD_QUEUE_LEN: usize = 64;

#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct FeedConfig {
    pub ws_url: String, // of the endpoint that publishes train records
    pub reconnect_delay: Duration, // fixed delay between reconnect attempts
}

/// what the feed delivers to subscribers
#[derive(Debug,Clone)]
pub enum FeedEvent {
    /// one record from the single-location channel
    Update( TrainUpdate ),
    /// records from the multi-train batch channel
    Batch( Vec<TrainUpdate> ),
    /// transport state transitions, for logging/telemetry only
    Connected,
    Disconnected,
}

/// the transport client handle. Explicitly constructed and torn down - one per consumer,
/// no ambient singleton
pub struct TrainFeed {
    config: Arc<FeedConfig>,
    event_tx: broadcast::Sender<FeedEvent>,
    cmd_tx: Option<kanal::AsyncSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl TrainFeed {
    pub fn new (config: FeedConfig)->Self {
        let (event_tx, _) = broadcast::channel( EVENT_QUEUE_LEN);
        TrainFeed { config: Arc::new(config), event_tx, cmd_tx: None, task: None }
    }

    /// spawn the connection loop. A no-op while a loop is already running, so overlapping
    /// start attempts cannot stack connections
    pub fn start (&mut self)->Result<()> {
        if let Some(task) = &self.task {
            if !task.is_finished() { return Ok(()) }
        }

        let (cmd_tx, cmd_rx) = kanal::bounded_async( CMD_QUEUE_LEN);
        self.cmd_tx = Some(cmd_tx);
        self.task = Some( tokio::spawn( ws_loop( self.config.clone(), cmd_rx, self.event_tx.clone())));
        debug!("feed started for {}", self.config.ws_url);
        Ok(())
    }

    pub fn subscribe (&self)->broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    /// publish a record upstream (e.g. own position reports)
    pub async fn send_update (&self, upd: &TrainUpdate)->Result<()> {
        self.send_raw( serde_json::to_string( upd)?).await
    }

    /// ask the endpoint to replay the full fleet
    pub async fn request_refresh (&self)->Result<()> {
        self.send_raw( serde_json::to_string( &ClientRequest::Refresh)?).await
    }

    async fn send_raw (&self, msg: String)->Result<()> {
        let Some(cmd_tx) = &self.cmd_tx else { return Err( FeedError::NotConnectedError) };
        cmd_tx.send( msg).await.map_err( |_| FeedError::NotConnectedError)
    }

    /// terminate the connection loop. This closes the command channel, which the loop treats
    /// as nominal termination - no reconnect until `start()` re-arms the feed
    pub fn disconnect (&mut self) {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            cmd_tx.close();
        }
        self.task = None;
    }

    pub fn is_running (&self)->bool {
        self.task.as_ref().map_or( false, |t| !t.is_finished())
    }
}

impl Drop for TrainFeed {
    fn drop (&mut self) {
        self.disconnect();
    }
}
