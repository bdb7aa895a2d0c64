//! WebSocket transport layer and per-connection task wiring
//!
//! One task per connection drives the session state machine from the read
//! side; a companion writer task drains that session's outbound snapshot
//! queue into the socket. The authoritative world is a single
//! `Arc<RwLock<World>>`: sessions are its only writers (event application)
//! and the broadcast scheduler only ever reads it.

use crate::broadcast::{self, Registry, SharedRegistry, SharedWorld, OUTBOUND_QUEUE};
use crate::session::{Session, SessionError, SessionState};
use futures_util::{Sink, SinkExt, StreamExt};
use log::{error, info, warn};
use shared::World;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

/// A send that does not complete within this window marks the connection as
/// failed; it must not block the broadcast tick for other sessions.
const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Accepting server: owns the listener, the authoritative world, and the
/// broadcast registry.
pub struct Server {
    listener: TcpListener,
    world: SharedWorld,
    registry: SharedRegistry,
    tick_rate: u32,
}

impl Server {
    /// Binds the listen socket. `tick_rate` is the snapshot broadcast rate
    /// in ticks per second.
    pub async fn bind(addr: &str, tick_rate: u32) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            world: Arc::new(RwLock::new(World::new())),
            registry: Arc::new(RwLock::new(Registry::new())),
            tick_rate,
        })
    }

    /// Actual bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the authoritative world.
    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    /// Runs the accept loop and the broadcast scheduler until the process
    /// exits. Individual session failures never take this down.
    pub async fn run(self) {
        let _scheduler = tokio::spawn(broadcast::run(
            Arc::clone(&self.world),
            Arc::clone(&self.registry),
            self.tick_rate,
        ));

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let world = Arc::clone(&self.world);
                    let registry = Arc::clone(&self.registry);

                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, addr, world, registry).await {
                            warn!("Session from {} ended: {}", addr, err);
                        }
                    });
                }
                Err(err) => error!("Accept failed: {}", err),
            }
        }
    }
}

/// Drives one connection from upgrade to teardown.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    world: SharedWorld,
    registry: SharedRegistry,
) -> Result<(), SessionError> {
    let mut session = Session::new();

    let ws = tokio_tungstenite::accept_async(stream).await?;
    session.on_upgraded();
    info!("Client connected from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws.split();

    // Outbound snapshot queue. The writer task owns the sink; a timed-out or
    // failed send ends the task and with it the connection.
    let (out_tx, out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
    let mut writer = tokio::spawn(pump_outbound(out_rx, ws_sender));

    // Read loop. The session joins the broadcast the moment the handshake
    // puts it into the streaming state. Writer death is a teardown signal
    // too: a peer that stops accepting snapshots must not keep its avatar
    // alive by staying silent on the read side.
    let mut registration: Option<u64> = None;
    let mut writer_done = false;
    let result = loop {
        let next = tokio::select! {
            _ = &mut writer, if !writer_done => {
                writer_done = true;
                break Err(SessionError::Delivery);
            }
            next = ws_receiver.next() => next,
        };

        let message = match next {
            None => break Ok(()),
            Some(Err(err)) => break Err(SessionError::Transport(err)),
            Some(Ok(message)) => message,
        };

        match message {
            Message::Text(text) => {
                let applied = {
                    let mut world = world.write().await;
                    session.on_message(&mut world, &text)
                };
                if let Err(err) = applied {
                    break Err(err);
                }

                if registration.is_none() && session.state() == SessionState::Streaming {
                    registration = Some(registry.write().await.register(out_tx.clone()));
                }
            }
            Message::Binary(_) => {
                if session.state() == SessionState::Handshaking {
                    break Err(SessionError::Protocol(
                        "binary frame during handshake".to_string(),
                    ));
                }
                warn!("Discarding binary frame from {}", addr);
            }
            Message::Close(_) => break Ok(()),
            // Ping/Pong frames are handled by tungstenite itself.
            _ => {}
        }
    };

    // Teardown: leave the broadcast first so no more snapshots are queued,
    // then let the writer drain and close the socket. Every pending send is
    // bounded by SEND_TIMEOUT, so this cannot hang on a dead peer.
    if let Some(id) = registration {
        registry.write().await.unregister(id);
    }
    drop(out_tx);
    if !writer_done {
        let _ = writer.await;
    }
    {
        let mut world = world.write().await;
        session.close(&mut world);
    }
    info!("Client {} disconnected", addr);

    result
}

/// Drains the outbound snapshot queue into the socket sink. Every send is
/// bounded by [`SEND_TIMEOUT`], and so is the final close: closing goes
/// through the same sink, and a peer stuck enough to time out a send will
/// stall the close handshake just as hard. Returning drops the queue
/// receiver, which is what the broadcast scheduler and the read loop key
/// their teardown on.
async fn pump_outbound<S>(mut out_rx: mpsc::Receiver<Message>, mut sink: S)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(message) = out_rx.recv().await {
        match timeout(SEND_TIMEOUT, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!("Send failed: {}", err);
                break;
            }
            Err(_) => {
                warn!("Send timed out");
                break;
            }
        }
    }
    let _ = timeout(SEND_TIMEOUT, sink.close()).await;
}
