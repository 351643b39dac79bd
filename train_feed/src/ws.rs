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

use std::sync::Arc;
use futures_util::{SinkExt,StreamExt};
use tokio::{select, sync::broadcast, time::sleep};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{info,warn};

use train_track::{parse_inbound,InboundUpdate};

use crate::{FeedConfig,FeedEvent};

/// the transport connection loop: connect, then shuttle inbound records and outbound requests
/// until the connection drops (reconnect after the configured delay) or the command channel is
/// closed (explicit disconnect, terminate without reconnect)
pub(crate) async fn ws_loop (config: Arc<FeedConfig>, cmd_rx: kanal::AsyncReceiver<String>, event_tx: broadcast::Sender<FeedEvent>) {
    loop {
        match connect_async( config.ws_url.as_str()).await {
            Ok((mut ws_stream, _response)) => {
                info!("connected to {}", config.ws_url);
                let _ = event_tx.send( FeedEvent::Connected);

                loop {
                    select! { // NOTE - this requires all awaited futures to be cancellation safe
                        maybe_msg = ws_stream.next() => { // in: train records from the endpoint
                            match maybe_msg {
                                Some(Ok(Message::Close(_))) | None => {
                                    info!("endpoint closed websocket, trying to reconnect..");
                                    break;
                                }
                                Some(Ok(msg)) => proc_incoming( msg, &event_tx),
                                Some(Err(e)) => {
                                    warn!("reconnecting after failed websocket read: {e}");
                                    break;
                                }
                            }
                        }

                        maybe_req = cmd_rx.recv() => { // out: requests to the endpoint
                            match maybe_req {
                                Ok(req) => {
                                    if let Err(e) = ws_stream.send( Message::text( req)).await {
                                        warn!("failed to write to websocket: {e}");
                                        break;
                                    }
                                }
                                Err(_) => return // cmd queue closed - nominal termination, no reconnect
                            }
                        }
                    }
                }
                let _ = event_tx.send( FeedEvent::Disconnected);
            }
            Err(e) => warn!("failed to connect to {}: {e}", config.ws_url)
        }

        if cmd_rx.is_closed() { return } // disconnected while unconnected - don't re-arm
        sleep( config.reconnect_delay).await;
        if cmd_rx.is_closed() { return } // a disconnect during the delay must not trigger one more connect
    }
}

/// decode one frame and fan it out. Malformed payloads are logged and dropped - they must
/// not take down the loop or affect other records
fn proc_incoming (msg: Message, event_tx: &broadcast::Sender<FeedEvent>) {
    let Message::Text(data) = msg else { return }; // ping/pong/binary are not ours to handle

    match parse_inbound( data.as_str()) {
        Ok(InboundUpdate::Single(upd)) => { let _ = event_tx.send( FeedEvent::Update( upd)); }
        Ok(InboundUpdate::Batch(upds)) => { let _ = event_tx.send( FeedEvent::Batch( upds)); }
        Err(e) => warn!("dropping malformed feed payload: {e}")
    }
}
