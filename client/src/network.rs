//! WebSocket connection: handshake, inbound apply loop, outbound event pump

use crate::game::Replica;
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use shared::Event;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Connects to the server, performs the init handshake, then pumps events
/// both ways until the connection drops. The replica is marked disconnected
/// on any exit path so the presentation layer can surface it.
pub async fn run(
    url: String,
    init: Event,
    mut outbound: mpsc::UnboundedReceiver<Event>,
    replica: Replica,
) {
    let (ws, _) = match connect_async(url.as_str()).await {
        Ok(connected) => connected,
        Err(err) => {
            error!("Failed to connect to {}: {}", url, err);
            return;
        }
    };
    info!("Connected to {}", url);

    let (mut ws_sender, mut ws_receiver) = ws.split();

    // Handshake: the first message on the wire must be our init event.
    let handshake = match init.encode() {
        Ok(text) => text,
        Err(err) => {
            error!("Failed to encode handshake: {}", err);
            return;
        }
    };
    if let Err(err) = ws_sender.send(Message::Text(handshake)).await {
        error!("Handshake send failed: {}", err);
        return;
    }
    replica.set_connected(true);

    loop {
        tokio::select! {
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => match Event::decode(&text) {
                        Ok(event) => replica.apply(&event),
                        Err(err) => warn!("Discarding undecodable message: {}", err),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        error!("Read failed: {}", err);
                        break;
                    }
                }
            }

            event = outbound.recv() => {
                match event {
                    Some(event) => match event.encode() {
                        Ok(text) => {
                            if let Err(err) = ws_sender.send(Message::Text(text)).await {
                                error!("Send failed: {}", err);
                                break;
                            }
                        }
                        Err(err) => error!("Failed to encode event: {}", err),
                    },
                    // The presentation loop is gone; nothing left to send.
                    None => break,
                }
            }
        }
    }

    replica.set_connected(false);
}
