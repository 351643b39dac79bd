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

use std::{net::SocketAddr, time::Duration};
use futures_util::{SinkExt,StreamExt};
use serde_json::Value;
use tokio::{net::TcpListener, sync::broadcast, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};

use train_feed::FeedEvent;
use train_server::{ServerConfig,TrackConfig,TrainServerConfig,WsMsg,hub::TrackHub};
use train_track::TrainUpdate;

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// run with "cargo test -p train_server --test test_hub"

#[test]
fn test_ws_msg_envelope () {
    let payload = TrainUpdate::from_position( "t1", 36.80, 10.18);
    let msg = WsMsg::new( "train_server/track.js", "update", &payload).to_json().unwrap();

    let parsed: Value = serde_json::from_str( &msg).unwrap();
    assert_eq!( parsed["mod"], "train_server/track.js");
    assert_eq!( parsed["update"]["id"], "t1");
    assert_eq!( parsed["update"]["lat"], 36.80);
}

#[test]
fn test_config_from_ron () {
    let path = concat!( env!("CARGO_MANIFEST_DIR"), "/../config/train_server.ron");
    let config: TrainServerConfig = train_common::config::load_config( path).unwrap();

    assert_eq!( config.server.name, "train");
    assert_eq!( config.track.max_trace, 50);
    assert_eq!( config.feed.reconnect_delay, Duration::from_secs(5));
}

/// read ws messages until one carries the wanted payload field, returning that payload
async fn next_payload (ws: &mut WsClient, payload_name: &str)->Value {
    loop {
        let msg = timeout( RECV_TIMEOUT, ws.next()).await
            .expect("timeout waiting for ws message")
            .expect("websocket closed")
            .expect("websocket read failed");

        if let Message::Text(data) = msg {
            let parsed: Value = serde_json::from_str( data.as_str()).unwrap();
            assert_eq!( parsed["mod"], "train_server/track.js");
            if !parsed[payload_name].is_null() {
                return parsed[payload_name].clone();
            }
        }
    }
}

#[tokio::test]
async fn test_hub_end_to_end () {
    let (feed_tx, feed_rx) = broadcast::channel::<FeedEvent>(16);

    let server_config = ServerConfig {
        sock_addr: "127.0.0.1:0".parse().unwrap(), // overridden below, required by the type
        name: "train".to_string(),
    };
    let track_config = TrackConfig {
        max_trace: 50,
        drop_after: Duration::from_secs(0),
        update_interval: Duration::from_millis(100),
        frame_interval: Duration::from_millis(20),
        move_duration: Duration::from_millis(200),
    };

    let hub = TrackHub::new( server_config, track_config, feed_rx);

    // serve on an ephemeral port so tests don't collide
    let listener = TcpListener::bind( "127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router_svc = hub.router().into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn( async move { axum::serve( listener, router_svc).await.unwrap(); });
    tokio::spawn( hub.run());

    let (mut ws, _) = connect_async( format!("ws://{addr}/train/ws")).await.unwrap();

    // a new client gets the (still empty) fleet snapshot right away
    let snapshot = next_payload( &mut ws, "snapshot").await;
    assert_eq!( snapshot["trains"].as_array().unwrap().len(), 0);

    // first sighting: next sweep broadcasts the new train
    let mut upd = TrainUpdate::from_position( "t1", 36.80, 10.18);
    upd.name = Some("Express".to_string());
    feed_tx.send( FeedEvent::Update( upd)).unwrap();

    let update = next_payload( &mut ws, "update").await;
    let trains = update["trains"].as_array().unwrap();
    assert_eq!( trains.len(), 1);
    assert_eq!( trains[0]["id"], "t1");
    assert_eq!( trains[0]["name"], "Express");

    // a moved position starts a marker animation that ends exactly on the target
    feed_tx.send( FeedEvent::Batch( vec![ TrainUpdate::from_position( "t1", 36.82, 10.20) ])).unwrap();

    loop {
        let frames = next_payload( &mut ws, "frames").await;
        let frame = &frames.as_array().unwrap()[0];
        assert_eq!( frame["id"], "t1");
        if frame["done"].as_bool().unwrap() {
            assert!( (frame["lat"].as_f64().unwrap() - 36.82).abs() < 1e-9);
            assert!( (frame["lon"].as_f64().unwrap() - 10.20).abs() < 1e-9);
            break;
        }
    }

    // an explicit refresh request replays the full fleet
    ws.send( Message::text( r#"{"op":"refresh"}"#)).await.unwrap();
    let snapshot = next_payload( &mut ws, "snapshot").await;
    let trains = snapshot["trains"].as_array().unwrap();
    assert_eq!( trains.len(), 1);
    assert_eq!( trains[0]["name"], "Express");
    assert_eq!( trains[0]["lat"].as_f64().unwrap(), 36.82);
}
