//! Reconnecting network task.
//!
//! The task owns the socket and nothing else. Inbound messages and
//! connection changes go to the world loop as [`NetEvent`]s; outbound
//! messages come back through a queue. The loop never waits on the socket.
//!
//! On every successful connect the task sends `join_room` before anything
//! else, so a reconnect lands the player back in the room.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use iso_shared::{
    config::ReconnectConfig,
    net::{MessageStream, NetMsg, ReliableConn},
};
use rand::Rng;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

/// Capped exponential backoff with random jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            base,
            max: max.max(base),
            jitter: jitter.clamp(0.0, 1.0),
            attempt: 0,
        }
    }

    pub fn from_config(cfg: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(cfg.delay_ms),
            Duration::from_millis(cfg.delay_max_ms),
            cfg.jitter,
        )
    }

    /// Delay before the next attempt, without jitter.
    pub fn raw_delay(&self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt.min(16)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay before the next attempt. Never exceeds the cap.
    pub fn next_delay<G: Rng + ?Sized>(&mut self, rng: &mut G) -> Duration {
        let raw = self.raw_delay();
        self.attempt = self.attempt.saturating_add(1);
        if self.jitter == 0.0 {
            return raw;
        }
        let spread = rng.gen_range(-self.jitter..=self.jitter);
        raw.mul_f64(1.0 + spread).min(self.max)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Opens message streams to the room server.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(&self) -> anyhow::Result<Box<dyn MessageStream>>;
}

/// Dials the server over framed TCP with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpDialer {
    pub fn new(addr: &str, timeout: Duration) -> anyhow::Result<Self> {
        let addr = addr.parse().context("parse server_addr")?;
        Ok(Self { addr, timeout })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self) -> anyhow::Result<Box<dyn MessageStream>> {
        let conn = tokio::time::timeout(self.timeout, ReliableConn::connect(self.addr))
            .await
            .with_context(|| format!("connect to {} timed out", self.addr))??;
        match conn.peer_addr() {
            Ok(peer) => debug!(%peer, "Dialed room server"),
            Err(e) => debug!(error = %e, "Dialed room server, peer address unavailable"),
        }
        Ok(Box::new(conn))
    }
}

/// What the network task reports to the world loop.
#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    /// Joined after connecting; `reconnect` is false only the first time.
    Connected { reconnect: bool },
    Disconnected { reason: String },
    ConnectFailed { error: String },
    Message(NetMsg),
}

/// Owning handle to a running network task.
#[derive(Debug)]
pub struct NetHandle {
    outbound: mpsc::UnboundedSender<NetMsg>,
    task: JoinHandle<()>,
}

impl NetHandle {
    /// Queues a message for the current connection.
    pub fn send(&self, msg: NetMsg) -> bool {
        self.outbound.send(msg).is_ok()
    }

    /// Stops the task and drops the socket.
    pub fn detach(self) {
        self.task.abort();
    }
}

/// Spawns the network task. Must be called inside a tokio runtime.
///
/// The task exits on its own once the returned event receiver is dropped.
pub fn spawn<D: Dialer>(
    dialer: D,
    join: NetMsg,
    backoff: Backoff,
) -> (NetHandle, mpsc::UnboundedReceiver<NetEvent>) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(dialer, join, backoff, out_rx, ev_tx));
    (
        NetHandle {
            outbound: out_tx,
            task,
        },
        ev_rx,
    )
}

async fn run<D: Dialer>(
    dialer: D,
    join: NetMsg,
    mut backoff: Backoff,
    mut outbound: mpsc::UnboundedReceiver<NetMsg>,
    events: mpsc::UnboundedSender<NetEvent>,
) {
    let mut joined_before = false;

    loop {
        let dialed = tokio::select! {
            _ = events.closed() => break,
            r = dialer.dial() => r,
        };

        let mut conn = match dialed {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, attempt = backoff.attempt(), "Connect failed");
                if events
                    .send(NetEvent::ConnectFailed {
                        error: format!("{e:#}"),
                    })
                    .is_err()
                {
                    break;
                }
                if !pause(&mut backoff, &events).await {
                    break;
                }
                continue;
            }
        };

        // Anything queued while offline is stale.
        while outbound.try_recv().is_ok() {}

        if let Err(e) = conn.send(&join).await {
            warn!(error = %e, "Failed to send join");
            if events
                .send(NetEvent::Disconnected {
                    reason: format!("{e:#}"),
                })
                .is_err()
            {
                break;
            }
            if !pause(&mut backoff, &events).await {
                break;
            }
            continue;
        }

        backoff.reset();
        info!(reconnect = joined_before, "Connected and joined");
        if events
            .send(NetEvent::Connected {
                reconnect: joined_before,
            })
            .is_err()
        {
            break;
        }
        joined_before = true;

        let reason = loop {
            tokio::select! {
                _ = events.closed() => return,
                inbound = conn.recv() => match inbound {
                    Ok(msg) => {
                        debug!(?msg, "Inbound message");
                        if events.send(NetEvent::Message(msg)).is_err() {
                            return;
                        }
                    }
                    Err(e) => break format!("{e:#}"),
                },
                out = outbound.recv() => match out {
                    Some(msg) => {
                        if let Err(e) = conn.send(&msg).await {
                            break format!("{e:#}");
                        }
                    }
                    None => return,
                },
            }
        };

        warn!(%reason, "Connection lost");
        if events
            .send(NetEvent::Disconnected { reason })
            .is_err()
        {
            break;
        }
        if !pause(&mut backoff, &events).await {
            break;
        }
    }

    debug!("Network task exiting");
}

/// Sleeps for the next backoff delay. Returns false if the receiver went
/// away in the meantime.
async fn pause(backoff: &mut Backoff, events: &mpsc::UnboundedSender<NetEvent>) -> bool {
    let delay = backoff.next_delay(&mut rand::thread_rng());
    debug!(?delay, attempt = backoff.attempt(), "Retrying after delay");
    tokio::select! {
        _ = events.closed() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn backoff() -> Backoff {
        Backoff::from_config(&ReconnectConfig::default())
    }

    #[test]
    fn raw_delay_doubles_up_to_cap() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_millis(2500), 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        let delays: Vec<u64> = (0..6)
            .map(|_| b.next_delay(&mut rng).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 2500, 2500, 2500]);
    }

    #[test]
    fn jittered_delay_stays_within_band_and_cap() {
        let mut b = backoff();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let raw = b.raw_delay();
            let d = b.next_delay(&mut rng);
            assert!(d >= raw.mul_f64(0.5), "{d:?} below band of {raw:?}");
            assert!(d <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn reset_starts_over() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_millis(2500), 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        b.next_delay(&mut rng);
        b.next_delay(&mut rng);
        assert_eq!(b.attempt(), 2);
        b.reset();
        assert_eq!(b.next_delay(&mut rng), Duration::from_millis(500));
    }

    #[test]
    fn many_attempts_do_not_overflow() {
        let mut b = backoff();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            b.next_delay(&mut rng);
        }
        assert!(b.raw_delay() <= Duration::from_millis(2500));
    }

    #[test]
    fn tcp_dialer_rejects_bad_address() {
        assert!(TcpDialer::new("not an address", Duration::from_secs(1)).is_err());
        let d = TcpDialer::new("127.0.0.1:5001", Duration::from_secs(1)).unwrap();
        assert_eq!(d.addr().port(), 5001);
    }
}
