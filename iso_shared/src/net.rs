//! Networking primitives.
//!
//! Goals:
//! - Name every room event the client consumes or emits as one enum.
//! - Frame JSON messages over a byte stream with a length prefix.
//! - Decode coordinates leniently so bad numbers surface as NaN and are
//!   handled by the client's recovery rules instead of failing the frame.

use std::collections::HashMap;
use std::net::SocketAddr;

use anyhow::Context;
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tracing::warn;

use crate::map::MapData;

/// Largest frame accepted from a peer.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Server-assigned connection id.
pub type SessionId = String;

/// Room event envelope: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum NetMsg {
    // ─── Server -> client ───
    /// Sent on connect. Carries the map when the server has one.
    ServerInfo {
        #[serde(default)]
        room: Option<String>,
        #[serde(default)]
        map: Option<MapData>,
    },
    /// Full replacement of map and players on room entry.
    RoomSnapshot {
        #[serde(default)]
        you: Option<SessionId>,
        room: String,
        map: MapData,
        #[serde(default)]
        players: HashMap<SessionId, PlayerState>,
    },
    PlayerJoined(PlayerState),
    PlayerLeft {
        sid: SessionId,
    },
    PlayerMoved {
        sid: SessionId,
        #[serde(default = "nan", deserialize_with = "lenient_coord")]
        x: f32,
        #[serde(default = "nan", deserialize_with = "lenient_coord")]
        y: f32,
    },
    ChatMsg {
        #[serde(default)]
        sid: Option<SessionId>,
        name: String,
        msg: String,
    },

    // ─── Client -> server ───
    JoinRoom {
        name: String,
        monster: String,
    },
    MoveTo {
        x: i32,
        y: i32,
    },
    Chat {
        msg: String,
    },
}

/// Player record as reported by the server. Type and name are raw strings;
/// the client validates them when the record enters its registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    pub sid: SessionId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub monster: Option<String>,
    #[serde(default = "nan", deserialize_with = "lenient_coord")]
    pub x: f32,
    #[serde(default = "nan", deserialize_with = "lenient_coord")]
    pub y: f32,
}

pub(crate) fn nan() -> f32 {
    f32::NAN
}

/// Numbers pass through, numeric strings are parsed, anything else is NaN.
pub(crate) fn lenient_coord<'de, D>(de: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().map(|v| v as f32).unwrap_or(f32::NAN),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(f32::NAN),
        _ => f32::NAN,
    })
}

/// A bidirectional message channel.
#[async_trait]
pub trait MessageStream: Send {
    async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<NetMsg>;
}

/// Reliable connection with length-prefixed frames.
///
/// Reads go through an internal buffer, so `recv` is cancel safe and can sit
/// in a `select!` next to outbound sends.
#[derive(Debug)]
pub struct ReliableConn<S = TcpStream> {
    stream: S,
    read_buf: BytesMut,
}

impl<S> ReliableConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
        }
    }

    pub async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(msg).context("serialize msg")?;
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(&payload);
        self.stream.write_all(&buf).await.context("write frame")?;
        Ok(())
    }

    /// Receives the next decodable message. Frames that do not decode are
    /// logged and skipped; the connection stays up.
    pub async fn recv(&mut self) -> anyhow::Result<NetMsg> {
        loop {
            while let Some(payload) = self.next_frame()? {
                match decode_from_bytes(&payload) {
                    Ok(msg) => return Ok(msg),
                    Err(e) => warn!(error = %e, len = payload.len(), "Dropping undecodable frame"),
                }
            }
            let n = self
                .stream
                .read_buf(&mut self.read_buf)
                .await
                .context("read frame")?;
            if n == 0 {
                anyhow::bail!("connection closed by peer");
            }
        }
    }

    fn next_frame(&mut self) -> anyhow::Result<Option<Bytes>> {
        if self.read_buf.len() < 4 {
            return Ok(None);
        }
        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(&self.read_buf[..4]);
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            anyhow::bail!("frame of {len} bytes exceeds limit");
        }
        if self.read_buf.len() < 4 + len {
            self.read_buf.reserve(4 + len - self.read_buf.len());
            return Ok(None);
        }
        self.read_buf.advance(4);
        Ok(Some(self.read_buf.split_to(len).freeze()))
    }
}

impl ReliableConn<TcpStream> {
    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("tcp connect")?;
        stream.set_nodelay(true).context("tcp nodelay")?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

#[async_trait]
impl<S> MessageStream for ReliableConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        ReliableConn::send(self, msg).await
    }

    async fn recv(&mut self) -> anyhow::Result<NetMsg> {
        ReliableConn::recv(self).await
    }
}

/// TCP listener producing framed connections.
pub struct ReliableListener {
    listener: TcpListener,
}

impl ReliableListener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> anyhow::Result<(ReliableConn, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.context("tcp accept")?;
        Ok((ReliableConn::new(stream), addr))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Convenience codec helpers.
pub fn encode_to_bytes(msg: &NetMsg) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<NetMsg> {
    serde_json::from_slice(b).context("deserialize")
}
