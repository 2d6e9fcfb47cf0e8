//! Helpers shared by the socket-level tests: a scripted room server on an
//! ephemeral port and a loop driver for client sessions.

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use iso_client::Session;
use iso_shared::{
    config::ClientConfig,
    map::{Decoration, DecorationKind, MapData},
    net::{NetMsg, PlayerState, ReliableConn, ReliableListener},
    render::RenderBackend,
};
use tracing::info;

/// How long a test waits for anything network related.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A room server whose every reply is written by the test.
pub struct ScriptedServer {
    listener: ReliableListener,
}

/// One accepted client that has already sent `join_room`.
pub struct JoinedClient {
    pub conn: ReliableConn,
    pub name: String,
    pub monster: String,
}

impl ScriptedServer {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts one connection and reads its join request.
    pub async fn accept_join(&self) -> anyhow::Result<JoinedClient> {
        let (mut conn, peer) = within(self.listener.accept()).await??;
        match within(conn.recv()).await?? {
            NetMsg::JoinRoom { name, monster } => {
                info!(%peer, %name, %monster, "Scripted server: join");
                Ok(JoinedClient {
                    conn,
                    name,
                    monster,
                })
            }
            other => anyhow::bail!("expected join_room, got {other:?}"),
        }
    }
}

/// Binds a scripted server on localhost and returns a client config aimed
/// at it with short reconnect delays.
pub async fn bind_ephemeral() -> anyhow::Result<(ScriptedServer, ClientConfig)> {
    let bind = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let listener = ReliableListener::bind(bind).await?;
    let addr = listener.local_addr()?;

    let mut cfg = ClientConfig {
        server_addr: addr.to_string(),
        ..ClientConfig::default()
    };
    cfg.reconnect.delay_ms = 20;
    cfg.reconnect.delay_max_ms = 50;
    cfg.reconnect.connect_timeout_ms = 1000;

    Ok((ScriptedServer { listener }, cfg))
}

/// A small room map with a few trees.
pub fn test_map(w: u32, h: u32) -> MapData {
    MapData {
        w,
        h,
        tiles: None,
        objects: vec![
            Decoration {
                kind: DecorationKind::Tree,
                x: 1.0,
                y: 2.0,
            },
            Decoration {
                kind: DecorationKind::Tree,
                x: 3.0,
                y: 1.0,
            },
        ],
    }
}

pub fn player(sid: &str, name: &str, monster: &str, x: f32, y: f32) -> PlayerState {
    PlayerState {
        sid: sid.into(),
        name: Some(name.into()),
        monster: Some(monster.into()),
        x,
        y,
    }
}

pub fn snapshot(you: &str, map: MapData, players: Vec<PlayerState>) -> NetMsg {
    NetMsg::RoomSnapshot {
        you: Some(you.into()),
        room: "lobby".into(),
        map,
        players: players
            .into_iter()
            .map(|p| (p.sid.clone(), p))
            .collect::<HashMap<_, _>>(),
    }
}

/// Applies session events until `done` holds.
pub async fn pump_until<R, F>(session: &mut Session<R>, mut done: F) -> anyhow::Result<()>
where
    R: RenderBackend,
    F: FnMut(&Session<R>) -> bool,
{
    within(async {
        while !done(session) {
            if !session.process_next().await {
                anyhow::bail!("network task ended");
            }
        }
        Ok(())
    })
    .await?
}

/// Runs `fut` under [`TEST_TIMEOUT`].
pub async fn within<F, T>(fut: F) -> anyhow::Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, fut)
        .await
        .context("timed out")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}
