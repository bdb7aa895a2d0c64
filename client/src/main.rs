use clap::Parser;
use client::game::Replica;
use client::input::{self, HeldKeys};
use client::network;
use client::rendering::Renderer;
use log::{error, info};
use macroquad::prelude::{next_frame, Conf};
use shared::{Event, SCREEN_HEIGHT, SCREEN_WIDTH};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket endpoint of the world server
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "worldsync".to_owned(),
        window_width: SCREEN_WIDTH as i32,
        window_height: SCREEN_HEIGHT as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let (init, id) = Event::new_player_init();
    info!("Joining {} as avatar {}", args.server, id);
    info!("Controls: WASD or arrow keys to move");

    let replica = Replica::new();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    // macroquad owns this thread's event loop; the WebSocket side runs on
    // its own tokio runtime.
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {}", err);
            return;
        }
    };
    runtime.spawn(network::run(
        args.server.clone(),
        init,
        event_rx,
        replica.clone(),
    ));

    let renderer = Renderer::new();

    // Input is sampled at the fixed tick rate, independent of the display's
    // frame rate, so the animation phase advances at 60 Hz everywhere.
    let input_tick = Duration::from_millis(16);
    let mut last_input = Instant::now();

    loop {
        if replica.is_connected() && last_input.elapsed() >= input_tick {
            last_input = Instant::now();
            for event in input::events_for_tick(&id, HeldKeys::sample()) {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        }

        let avatars = replica.render_avatars();
        renderer.draw(&avatars, replica.is_connected());

        next_frame().await;
    }
}
