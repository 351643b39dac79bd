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

//! connect to a train position feed and print whatever it delivers
//!
//! run with: cargo run -p train_feed --example monitor_feed [ws-url]

use anyhow::Result;

use train_common::datetime::secs;
use train_feed::{FeedConfig,FeedEvent,TrainFeed};

#[tokio::main]
async fn main ()->Result<()> {
    let ws_url = std::env::args().nth(1).unwrap_or_else( || "ws://localhost:5001/ws/websocket".to_string());

    let mut feed = TrainFeed::new( FeedConfig { ws_url, reconnect_delay: secs(5) });
    let mut events = feed.subscribe();
    feed.start()?;

    loop {
        match events.recv().await? {
            FeedEvent::Update(upd) => println!("{upd:?}"),
            FeedEvent::Batch(upds) => {
                println!("------------------ batch of {}", upds.len());
                for upd in &upds { println!("{upd:?}") }
            }
            FeedEvent::Connected => println!("connected"),
            FeedEvent::Disconnected => println!("disconnected"),
        }
    }
}
