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

//! serve live train positions to map clients:
//! read records from the configured websocket feed, track the fleet and push
//! snapshots/updates/marker frames to everything connected under /{name}/ws

use std::path::PathBuf;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;
use anyhow::Result;

use train_common::config::load_config;
use train_feed::TrainFeed;
use train_server::{hub::TrackHub, TrainServerConfig};

#[derive(StructOpt,Debug)]
#[structopt(about = "live train tracking hub")]
struct Opt {
    /// path to the RON config file
    #[structopt(short, long, default_value = "config/train_server.ron")]
    config: PathBuf,

    /// log at debug level (RUST_LOG overrides)
    #[structopt(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main ()->Result<()> {
    let opt = Opt::from_args();

    let default_level = if opt.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new( default_level)))
        .init();

    let config: TrainServerConfig = load_config( &opt.config)?;

    let mut feed = TrainFeed::new( config.feed.clone());
    let hub = TrackHub::new( config.server.clone(), config.track.clone(), feed.subscribe());

    let server_task = hub.spawn_server_task();
    let hub_task = tokio::spawn( hub.run());
    feed.start()?;

    println!("serving train data on {}/{} (ctrl-c to terminate)", config.server.url(), config.server.name);
    tokio::signal::ctrl_c().await?;

    feed.disconnect();
    hub_task.abort();
    server_task.abort();

    Ok(())
}
