//! A sender session with one receiver.
//!
//! [`CastSession`] owns the connection together with its reassembly,
//! keepalive and request-id state. It spawns nothing: the caller drives
//! it by awaiting [`poll_receive`](CastSession::poll_receive) in a loop
//! and issuing commands between polls.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::codec::build_and_send;
use crate::config::SessionConfig;
use crate::error::CastError;
use crate::frame::{Frame, Payload};
use crate::namespace::{DEFAULT_RECEIVER_ID, Namespace};
use crate::network::{Connection, ConnectionInfo, Connector};
use crate::protocol::LoadRequest;
use crate::protocol::control;
use crate::state::{
    KeepaliveAction, KeepaliveMonitor, Progress, ReceiveReassembler, RequestSequencer,
};

/// What one call to [`CastSession::poll_receive`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A complete frame.
    Frame(Frame),
    /// Bytes arrived but the frame is still incomplete.
    Pending,
    /// The line went quiet; send a PING.
    PingRequired,
    /// Still quiet while waiting for the PONG.
    AwaitingPong,
    /// [`InterruptHandle::interrupt`] was called.
    Interrupted,
}

/// Wakes a session blocked in [`CastSession::poll_receive`].
///
/// An interrupt issued while no poll is running is remembered and ends
/// the next poll immediately.
#[derive(Debug, Clone)]
pub struct InterruptHandle(Arc<Notify>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.notify_one();
    }
}

pub struct CastSession<S> {
    conn: Connection<S>,
    reassembler: ReceiveReassembler,
    keepalive: KeepaliveMonitor,
    sequencer: RequestSequencer,
    read_buf: Vec<u8>,
    wake: Arc<Notify>,
    pong_retries: u32,
}

impl<S> CastSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Open a secure connection to `host:port` (port 0 means 8009).
    pub async fn connect<C>(
        connector: &C,
        host: &str,
        port: u16,
        config: &SessionConfig,
    ) -> Result<Self, CastError>
    where
        C: Connector<Stream = S>,
    {
        let conn = connector.connect(&ConnectionInfo::new(host, port)).await?;
        Ok(Self::from_connection(conn, config))
    }

    pub fn from_connection(conn: Connection<S>, config: &SessionConfig) -> Self {
        let reassembler = ReceiveReassembler::new();
        Self {
            read_buf: vec![0; reassembler.max_read_len()],
            reassembler,
            keepalive: KeepaliveMonitor::new(config.keepalive.clone()),
            sequencer: RequestSequencer::new(),
            wake: Arc::new(Notify::new()),
            pong_retries: config.keepalive.pong_retries,
            conn,
        }
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(Arc::clone(&self.wake))
    }

    /// Address the receiver should use to reach this host.
    pub fn local_ip(&self) -> IpAddr {
        self.conn.local_ip()
    }

    pub fn peer(&self) -> &ConnectionInfo {
        self.conn.peer()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    pub fn keepalive(&self) -> &KeepaliveMonitor {
        &self.keepalive
    }

    pub fn reassembler(&self) -> &ReceiveReassembler {
        &self.reassembler
    }

    /// Wait for inbound bytes for at most the keepalive deadline.
    ///
    /// Reads never cross a frame boundary. Once some bytes have arrived
    /// in this call, further reads are attempted until the frame completes
    /// or the line goes quiet again, which yields [`PollOutcome::Pending`].
    /// A partial frame survives across calls and across errors.
    pub async fn poll_receive(&mut self) -> Result<PollOutcome, CastError> {
        let deadline = self.keepalive.wait_deadline();
        let mut observed = false;

        loop {
            let want = self.reassembler.next_read_len();
            let read = tokio::select! {
                biased;
                _ = self.wake.notified() => return Ok(PollOutcome::Interrupted),
                r = tokio::time::timeout(deadline, self.conn.receive(&mut self.read_buf[..want])) => r,
            };

            let n = match read {
                Ok(result) => result?,
                Err(_) if observed => return Ok(PollOutcome::Pending),
                Err(_) => return self.on_silence(),
            };
            if n == 0 {
                debug!("{} closed the connection", self.conn.peer());
                return Err(CastError::ConnectionClosed);
            }

            observed = true;
            self.keepalive.on_traffic_observed();

            let (_, progress) = self.reassembler.feed(&self.read_buf[..n]);
            match progress {
                Progress::NeedMore => continue,
                Progress::Frame(body) => return Frame::from_body(&body).map(PollOutcome::Frame),
                Progress::Dropped { declared } => {
                    return Err(CastError::FrameTooLarge {
                        size: declared,
                        max: self.reassembler.max_payload(),
                    });
                }
            }
        }
    }

    fn on_silence(&mut self) -> Result<PollOutcome, CastError> {
        match self.keepalive.on_timeout() {
            KeepaliveAction::SendPing => {
                warn!("no PING received, sending a PING");
                Ok(PollOutcome::PingRequired)
            }
            KeepaliveAction::KeepWaiting => Ok(PollOutcome::AwaitingPong),
            KeepaliveAction::ConnectionDead => {
                error!("no PONG received from {}, connection lost", self.conn.peer());
                Err(CastError::PeerUnresponsive {
                    retries: self.pong_retries,
                })
            }
        }
    }

    /// Close the secure stream. Further commands fail with `NotConnected`.
    pub async fn disconnect(&mut self) {
        self.conn.disconnect().await;
        self.reassembler.reset();
    }

    async fn send_text(
        &mut self,
        namespace: Namespace,
        destination_id: &str,
        text: String,
    ) -> Result<(), CastError> {
        build_and_send(&mut self.conn, namespace, Payload::Text(text), destination_id).await
    }

    // ── Connection-level messages ────────────────────────────────

    pub async fn send_auth_challenge(&mut self) -> Result<(), CastError> {
        build_and_send(
            &mut self.conn,
            Namespace::DeviceAuth,
            Payload::Binary(control::auth_challenge()),
            DEFAULT_RECEIVER_ID,
        )
        .await
    }

    pub async fn send_ping(&mut self) -> Result<(), CastError> {
        self.send_text(Namespace::Heartbeat, DEFAULT_RECEIVER_ID, control::ping()?)
            .await
    }

    pub async fn send_pong(&mut self) -> Result<(), CastError> {
        self.send_text(Namespace::Heartbeat, DEFAULT_RECEIVER_ID, control::pong()?)
            .await
    }

    /// Open a virtual connection to `destination_id`.
    pub async fn connect_to(&mut self, destination_id: &str) -> Result<(), CastError> {
        self.send_text(Namespace::Connection, destination_id, control::connect()?)
            .await
    }

    pub async fn close(&mut self, destination_id: &str) -> Result<(), CastError> {
        self.send_text(Namespace::Connection, destination_id, control::close()?)
            .await
    }

    // ── Receiver control ─────────────────────────────────────────

    pub async fn receiver_get_status(&mut self) -> Result<u32, CastError> {
        let id = self.sequencer.next_receiver_id();
        let json = control::receiver_get_status(id)?;
        self.send_text(Namespace::Receiver, DEFAULT_RECEIVER_ID, json)
            .await?;
        Ok(id)
    }

    /// Launch the default media receiver app.
    pub async fn launch_app(&mut self) -> Result<u32, CastError> {
        let id = self.sequencer.next_receiver_id();
        let json = control::receiver_launch(id)?;
        self.send_text(Namespace::Receiver, DEFAULT_RECEIVER_ID, json)
            .await?;
        Ok(id)
    }

    // ── Media control ────────────────────────────────────────────

    pub async fn media_get_status(&mut self, destination_id: &str) -> Result<u32, CastError> {
        let id = self.sequencer.next_media_id();
        let json = control::media_get_status(id)?;
        self.send_text(Namespace::Media, destination_id, json).await?;
        Ok(id)
    }

    /// Ask the app at `destination_id` to play this host's stream.
    pub async fn load(
        &mut self,
        destination_id: &str,
        request: &LoadRequest,
    ) -> Result<u32, CastError> {
        let id = self.sequencer.next_media_id();
        let json = control::media_load(id, self.conn.local_ip(), request)?;
        self.send_text(Namespace::Media, destination_id, json).await?;
        Ok(id)
    }

    pub async fn play(&mut self, destination_id: &str, session: &str) -> Result<u32, CastError> {
        control::check_session(session)?;
        let id = self.sequencer.next_media_id();
        let json = control::media_play(id, session)?;
        self.send_text(Namespace::Media, destination_id, json).await?;
        Ok(id)
    }

    pub async fn pause(&mut self, destination_id: &str, session: &str) -> Result<u32, CastError> {
        control::check_session(session)?;
        let id = self.sequencer.next_media_id();
        let json = control::media_pause(id, session)?;
        self.send_text(Namespace::Media, destination_id, json).await?;
        Ok(id)
    }

    pub async fn stop(&mut self, destination_id: &str, session: &str) -> Result<u32, CastError> {
        control::check_session(session)?;
        let id = self.sequencer.next_media_id();
        let json = control::media_stop(id, session)?;
        self.send_text(Namespace::Media, destination_id, json).await?;
        Ok(id)
    }

    /// Returns `Ok(None)` without sending anything when `level` is not in `[0, 1]`.
    pub async fn set_volume(
        &mut self,
        destination_id: &str,
        session: &str,
        level: f32,
        muted: bool,
    ) -> Result<Option<u32>, CastError> {
        control::check_session(session)?;
        if !control::volume_in_range(level) {
            debug!("ignoring volume {level} outside [0, 1]");
            return Ok(None);
        }
        let id = self.sequencer.next_media_id();
        let Some(json) = control::media_set_volume(id, session, level, muted)? else {
            return Ok(None);
        };
        self.send_text(Namespace::Media, destination_id, json).await?;
        Ok(Some(id))
    }

    /// Seek to `current_time` seconds.
    pub async fn seek(
        &mut self,
        destination_id: &str,
        session: &str,
        current_time: f64,
    ) -> Result<u32, CastError> {
        control::check_session(session)?;
        control::check_seek_time(current_time)?;
        let id = self.sequencer.next_media_id();
        let json = control::media_seek(id, session, current_time)?;
        self.send_text(Namespace::Media, destination_id, json).await?;
        Ok(id)
    }
}
