//! Headless client binary.
//!
//! Usage:
//!   cargo run -p iso_client --bin client -- [--addr 127.0.0.1:5001] [--name Ana]
//!       [--monster goblin] [--config client.json]
//!
//! The client joins the room, ticks the world at the configured frame rate
//! against a recording renderer and reads commands from stdin.
//!
//! Console commands:
//!   click <sx> <sy>   - Press the pointer at a screen position
//!   move <x> <y>      - Request a move to a cell
//!   say <message>     - Send chat message
//!   resize <w> <h>    - Resize the view
//!   focus / blur      - Give or take chat focus
//!   status            - Show session status
//!   leave / quit      - Shut down and exit

use std::env;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use iso_client::{
    client::Session,
    conn::TcpDialer,
    input::{PointerEvent, UiElements},
};
use iso_shared::{config::ClientConfig, math::GridCell, render::RecordingRenderer};
use tokio::sync::mpsc;
use tracing::{debug, info};

fn parse_args() -> anyhow::Result<ClientConfig> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => ClientConfig::from_file(Path::new(&args[i + 1]))?,
        _ => ClientConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                cfg.player_name = args[i + 1].clone();
                i += 2;
            }
            "--monster" if i + 1 < args.len() => {
                cfg.monster = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Runs one console line. Returns false when the client should exit.
fn exec_console(session: &mut Session<RecordingRenderer>, line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&cmd) = tokens.first() else {
        return true;
    };

    match cmd {
        "click" => match parse_pair::<f32>(&tokens) {
            Some((x, y)) => {
                // A focused chat box sits over the view.
                let over = if session.ui().chat_focused() {
                    UiElements::CHAT_INPUT
                } else {
                    UiElements::empty()
                };
                let ev = PointerEvent {
                    over,
                    ..PointerEvent::on_world(x, y)
                };
                match session.click(ev) {
                    Some(cell) => println!(
                        "Clicked cell ({}, {}) on {:?}",
                        cell.x,
                        cell.y,
                        session.world().map().tile_at(cell)
                    ),
                    None => println!("Click ignored"),
                }
            }
            None => println!("Usage: click <sx> <sy>"),
        },
        "move" => match parse_pair::<i32>(&tokens) {
            Some((x, y)) => {
                if !session.move_to(GridCell::new(x, y)) {
                    println!("Offline, move dropped");
                }
            }
            None => println!("Usage: move <x> <y>"),
        },
        "say" => {
            let text = tokens[1..].join(" ");
            session.say(&text);
        }
        "resize" => match parse_pair::<u32>(&tokens) {
            Some((w, h)) => session.resize(w, h),
            None => println!("Usage: resize <w> <h>"),
        },
        "focus" => session.focus_chat(),
        "blur" => session.blur_chat(),
        "status" => {
            let world = session.world();
            println!("Link: {:?}", session.link());
            println!("Room: {}", world.room().unwrap_or("-"));
            println!("You: {}", world.you().unwrap_or("-"));
            println!("Map: {}x{}", world.map().width(), world.map().height());
            println!("Chat focused: {}", session.ui().chat_focused());
            for e in world.registry().iter() {
                println!(
                    "  {} {} {} at ({:.2}, {:.2}) -> ({}, {}) facing {:?}",
                    e.sid, e.name, e.kind, e.current.x, e.current.y, e.target.x, e.target.y, e.facing
                );
            }
        }
        "leave" | "quit" | "exit" => return false,
        other => println!("Unknown command: {other}"),
    }
    true
}

fn parse_pair<T: std::str::FromStr>(tokens: &[&str]) -> Option<(T, T)> {
    match tokens {
        [_, a, b, ..] => Some((a.parse().ok()?, b.parse().ok()?)),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args().context("load config")?;
    info!(server = %cfg.server_addr, name = %cfg.player_name, monster = %cfg.monster, "Starting client");

    let dialer = TcpDialer::new(&cfg.server_addr, cfg.reconnect.connect_timeout())?;
    let mut session = Session::start(&cfg, dialer, RecordingRenderer::default());

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("> ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client started. Type 'status' for info, 'quit' to exit.");
    println!();

    let mut frame = tokio::time::interval(cfg.frame_interval());
    let mut last = Instant::now();
    let mut printed = session.world().chat().total();

    loop {
        tokio::select! {
            _ = frame.tick() => {
                let now = Instant::now();
                let stats = session.tick(now.duration_since(last).as_secs_f32());
                last = now;
                if stats.moving > 0 {
                    debug!(updated = stats.updated, moving = stats.moving, "Frame");
                }
            }
            line = console_rx.recv() => match line {
                Some(line) => {
                    if !exec_console(&mut session, &line) {
                        break;
                    }
                }
                None => break,
            },
            alive = session.process_next() => {
                if !alive {
                    break;
                }
            }
        }

        // Echo chat lines that arrived since the last pass.
        let chat = session.world().chat();
        for line in chat.since(printed) {
            println!("{line}");
        }
        printed = chat.total();
    }

    session.shutdown();
    info!("Client exited");
    Ok(())
}
