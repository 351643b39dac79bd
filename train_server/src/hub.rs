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

use std::{collections::HashMap, net::SocketAddr, sync::{Arc,RwLock}};
use axum::{
    extract::connect_info::ConnectInfo,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::header::CONTENT_TYPE,
    response::{IntoResponse,Response},
    routing::{Router,get},
};
use futures::{sink::SinkExt, stream::{SplitSink,StreamExt}};
use serde::Serialize;
use tokio::{select, sync::{broadcast,mpsc}, task::JoinHandle, time::interval};
use tracing::{debug,info,warn};

use train_common::datetime::EpochMillis;
use train_feed::FeedEvent;
use train_track::{
    animator::MarkerAnimator, ClientRequest, MergeOutcome, Train, TrainStore, TrainUpdate
};

use crate::{ServerConfig,TrackConfig,WsMsg,errors::{Result,ServerError}};

/// the JS module map clients use to dispatch our messages
const JS_MODULE: &'static str = "train_server/track.js";

const HUB_QUEUE_LEN: usize = 64;

/// struct to keep track of active map client connections
pub struct WsConnection {
    pub remote_addr: SocketAddr,
    pub ws_sender: SplitSink<WebSocket,Message>,
    pub ws_receiver_task: JoinHandle<()>,
}

/// messages processed by the hub task
#[derive(Debug)]
pub enum HubMsg {
    AddConnection { remote_addr: SocketAddr, ws: WebSocket },
    RemoveConnection { remote_addr: SocketAddr },
    ClientRequest { remote_addr: SocketAddr, request: ClientRequest },
}

#[derive(Serialize)]
#[serde(rename_all="camelCase")]
struct UpdatePayload<'a> {
    trains: Vec<&'a Train>,

    #[serde(skip_serializing_if="<[_]>::is_empty")]
    removed: &'a [Arc<String>],
}

/// the hub: single owner of the fleet store and the marker animator. Feed records, client
/// connections and the publish/frame timers all funnel into its task loop - there is no
/// shared mutable fleet state outside of it
pub struct TrackHub {
    server_config: ServerConfig,
    track_config: TrackConfig,

    store: TrainStore,
    animator: MarkerAnimator,
    last_published: EpochMillis,

    connections: HashMap<SocketAddr,WsConnection>,

    hub_tx: mpsc::Sender<HubMsg>,
    hub_rx: mpsc::Receiver<HubMsg>,
    feed_rx: broadcast::Receiver<FeedEvent>,

    latest_json: Arc<RwLock<String>>, // last published snapshot, pre-serialized for GET handlers
}

impl TrackHub {
    pub fn new (server_config: ServerConfig, track_config: TrackConfig, feed_rx: broadcast::Receiver<FeedEvent>)->Self {
        let (hub_tx, hub_rx) = mpsc::channel( HUB_QUEUE_LEN);
        let store = TrainStore::new( track_config.max_trace);
        let empty = store.snapshot( EpochMillis::now());

        TrackHub {
            server_config, track_config,
            store,
            animator: MarkerAnimator::new(),
            last_published: EpochMillis::new(0),
            connections: HashMap::new(),
            hub_tx, hub_rx, feed_rx,
            latest_json: Arc::new( RwLock::new( serde_json::to_string( &empty).unwrap_or_else( |_| "{}".into()))),
        }
    }

    pub fn hub_tx (&self)->mpsc::Sender<HubMsg> { self.hub_tx.clone() }

    pub fn router (&self)->Router {
        let name = self.server_config.name.clone();

        Router::new()
            .route( &format!("/{}/ws", name), get( {
                let hub_tx = self.hub_tx.clone();
                move |ws: WebSocketUpgrade, ci: ConnectInfo<SocketAddr>| { ws_handler( ws, ci, hub_tx) }
            }))
            .route( &format!("/{}/trains", name), get( {
                let latest_json = self.latest_json.clone();
                move || trains_handler( latest_json)
            }))
    }

    /// bind and serve the router on a background task
    pub fn spawn_server_task (&self)->JoinHandle<()> {
        let sock_addr = self.server_config.sock_addr;
        let router_svc = self.router().into_make_service_with_connect_info::<SocketAddr>();

        tokio::spawn( async move {
            let listener = tokio::net::TcpListener::bind( sock_addr).await.unwrap();
            axum::serve( listener, router_svc).await.unwrap();
        })
    }

    /// the hub task loop. Returns when both the hub channel and the feed are gone
    pub async fn run (mut self) {
        let mut update_interval = interval( self.track_config.update_interval);
        let mut frame_interval = interval( self.track_config.frame_interval);

        loop {
            select! {
                maybe_msg = self.hub_rx.recv() => {
                    match maybe_msg {
                        Some(msg) => self.process_msg( msg).await,
                        None => break
                    }
                }

                maybe_ev = self.feed_rx.recv() => {
                    match maybe_ev {
                        Ok(ev) => self.process_feed_event( ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => warn!("feed subscription lagged, {n} events skipped"),
                        Err(broadcast::error::RecvError::Closed) => break
                    }
                }

                _ = update_interval.tick() => self.publish_update().await,

                _ = frame_interval.tick() => self.publish_frames().await,
            }
        }
        info!("hub terminated");
    }

    async fn process_msg (&mut self, msg: HubMsg) {
        match msg {
            HubMsg::AddConnection{remote_addr, ws} => {
                if let Err(e) = self.add_connection( remote_addr, ws).await {
                    warn!("failed to add connection {remote_addr}: {e}");
                }
            }
            HubMsg::RemoveConnection{remote_addr} => {
                self.connections.remove( &remote_addr);
                debug!("removed connection {remote_addr}");
            }
            HubMsg::ClientRequest{remote_addr, request} => {
                match request {
                    ClientRequest::Refresh => {
                        if let Err(e) = self.send_snapshot( remote_addr).await {
                            warn!("failed to send snapshot to {remote_addr}: {e}");
                        }
                    }
                }
            }
        }
    }

    fn process_feed_event (&mut self, ev: FeedEvent) {
        match ev {
            FeedEvent::Update(upd) => self.merge_record( &upd),
            FeedEvent::Batch(upds) => {
                for upd in &upds { self.merge_record( upd) }
            }
            FeedEvent::Connected => info!("feed connected"),
            FeedEvent::Disconnected => info!("feed disconnected"),
        }
    }

    /// merge one record into the fleet and derive the marker motion from the outcome
    fn merge_record (&mut self, upd: &TrainUpdate) {
        let now = EpochMillis::now();

        match self.store.merge_update( upd, now) {
            MergeOutcome::Added(pos) => {
                if let Some(train) = upd.valid_id().and_then( |id| self.store.get( id)) {
                    self.animator.set_position( &train.id, pos);
                }
            }
            MergeOutcome::Moved{to, ..} => {
                if let Some(train) = upd.valid_id().and_then( |id| self.store.get( id)) {
                    self.animator.start_move( &train.id, to, self.track_config.move_duration, now);
                }
            }
            MergeOutcome::Unmoved | MergeOutcome::Rejected => {} // already logged by the store
        }
    }

    /// the periodic sweep: evict stale trains, then broadcast what changed since the last sweep
    async fn publish_update (&mut self) {
        let now = EpochMillis::now();

        self.store.remove_stale( now, self.track_config.drop_after);
        let removed = self.store.take_dropped();
        for id in &removed { self.animator.remove( id) }

        let msg = {
            let changed = self.store.changed_since( self.last_published);
            if changed.is_empty() && removed.is_empty() { return }

            let payload = UpdatePayload { trains: changed, removed: &removed };
            match WsMsg::new( JS_MODULE, "update", &payload).to_json() {
                Ok(msg) => msg,
                Err(e) => { warn!("failed to serialize update: {e}"); return }
            }
        };
        self.last_published = now;

        self.refresh_latest_json( now);
        self.broadcast_ws_msg( msg).await;
    }

    /// sample running marker moves at frame cadence. Idle fleets produce no frames and no traffic
    async fn publish_frames (&mut self) {
        if !self.animator.is_animating() { return }

        let frames = self.animator.advance( EpochMillis::now());
        if frames.is_empty() { return }

        match WsMsg::new( JS_MODULE, "frames", &frames).to_json() {
            Ok(msg) => self.broadcast_ws_msg( msg).await,
            Err(e) => warn!("failed to serialize frames: {e}")
        }
    }

    fn refresh_latest_json (&self, now: EpochMillis) {
        let snapshot = self.store.snapshot( now);
        if let Ok(data) = serde_json::to_string( &snapshot) {
            if let Ok(mut latest) = self.latest_json.write() {
                *latest = data;
            }
        }
    }

    /// called when receiving an AddConnection message from the ws route handler
    async fn add_connection (&mut self, remote_addr: SocketAddr, ws: WebSocket)->Result<()> {
        let (ws_sender, mut ws_receiver) = ws.split();

        let ws_receiver_task = {
            let hub_tx = self.hub_tx.clone();

            tokio::spawn( async move {
                while let Some(Ok(msg)) = ws_receiver.next().await {
                    if let Message::Text(data) = msg {
                        match serde_json::from_str::<ClientRequest>( data.as_str()) {
                            Ok(request) => { let _ = hub_tx.send( HubMsg::ClientRequest{remote_addr, request}).await; }
                            Err(e) => debug!("ignoring client message from {remote_addr}: {e}")
                        }
                    }
                }
                let _ = hub_tx.send( HubMsg::RemoveConnection{remote_addr}).await;
            })
        };

        self.connections.insert( remote_addr, WsConnection { remote_addr, ws_sender, ws_receiver_task });
        info!("added connection {remote_addr} ({} total)", self.connections.len());

        self.send_snapshot( remote_addr).await // new clients get the full fleet right away
    }

    async fn send_snapshot (&mut self, remote_addr: SocketAddr)->Result<()> {
        let snapshot = self.store.snapshot( EpochMillis::now());
        let msg = WsMsg::new( JS_MODULE, "snapshot", &snapshot).to_json()?;
        self.send_ws_msg( remote_addr, msg).await;
        Ok(())
    }

    async fn send_ws_msg (&mut self, remote_addr: SocketAddr, msg: String) {
        let mut failed = false;
        if let Some(conn) = self.connections.get_mut( &remote_addr) {
            failed = conn.ws_sender.send( Message::text( msg)).await.is_err();
        }
        if failed { self.drop_connection( remote_addr) }
    }

    async fn broadcast_ws_msg (&mut self, msg: String) {
        let mut failed: Vec<SocketAddr> = Vec::new();

        for conn in self.connections.values_mut() {
            if conn.ws_sender.send( Message::text( msg.clone())).await.is_err() {
                failed.push( conn.remote_addr);
            }
        }
        for remote_addr in failed { self.drop_connection( remote_addr) }
    }

    // a dead connection degrades to a dropped client, never to a hub failure
    fn drop_connection (&mut self, remote_addr: SocketAddr) {
        if let Some(conn) = self.connections.remove( &remote_addr) {
            conn.ws_receiver_task.abort();
            debug!("dropped unreachable connection {remote_addr}");
        }
    }
}

async fn ws_handler (ws: WebSocketUpgrade, ConnectInfo(remote_addr): ConnectInfo<SocketAddr>, hub_tx: mpsc::Sender<HubMsg>)->Response {
    ws.on_upgrade( move |ws| async move {
        let _ = hub_tx.send( HubMsg::AddConnection{remote_addr, ws}).await;
    }).into_response()
}

async fn trains_handler (latest_json: Arc<RwLock<String>>)->Response {
    let body = latest_json.read().map( |s| s.clone()).unwrap_or_else( |_| "{}".into());
    ( [(CONTENT_TYPE, "application/json")], body ).into_response()
}
