//! Drives a session from first CONNECT to media playing.
//!
//! The [`Sender`] owns the [`CastSession`] and runs on the caller's task.
//! Each loop iteration awaits one poll, reacts to what came back, and
//! expires requests the receiver never answered.

use std::time::Duration;

use castwire_core::protocol::{Inbound, MediaStatusEntry, ReceiverStatus};
use castwire_core::{
    CastSession, Command, DEFAULT_RECEIVER_ID, LoadRequest, MEDIA_RECEIVER_APP_ID,
    Namespace, PollOutcome, RequestTracker,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::error::SenderError;
use crate::phase::SenderPhase;

pub struct Sender<S> {
    session: CastSession<S>,
    tracker: RequestTracker,
    phase: SenderPhase,
    load: LoadRequest,
}

impl<S> Sender<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(session: CastSession<S>, load: LoadRequest, request_timeout: Duration) -> Self {
        Self {
            session,
            tracker: RequestTracker::with_default_timeout(request_timeout),
            phase: SenderPhase::default(),
            load,
        }
    }

    pub fn phase(&self) -> &SenderPhase {
        &self.phase
    }

    pub fn session(&self) -> &CastSession<S> {
        &self.session
    }

    pub fn pending_requests(&self) -> usize {
        self.tracker.pending_count()
    }

    /// Authenticate, open the platform channel and ask what is running.
    pub async fn start(&mut self) -> Result<(), SenderError> {
        self.phase.request_status()?;
        self.session.send_auth_challenge().await?;
        self.session.connect_to(DEFAULT_RECEIVER_ID).await?;
        let id = self.session.receiver_get_status().await?;
        self.tracker.track(id, Command::ReceiverGetStatus);
        Ok(())
    }

    /// Poll until the receiver closes us, the session fails, or the
    /// session's interrupt handle fires.
    ///
    /// An interrupt is treated as a request to stop: CLOSE is sent and
    /// the connection is torn down.
    pub async fn run(&mut self) -> Result<(), SenderError> {
        let result = self.run_inner().await;
        if result.is_err() {
            self.phase.force_close();
            self.session.disconnect().await;
        }
        result
    }

    async fn run_inner(&mut self) -> Result<(), SenderError> {
        while !self.phase.is_closed() {
            let outcome = match self.session.poll_receive().await {
                Ok(outcome) => outcome,
                Err(e) if e.is_recoverable() => {
                    warn!("dropping inbound frame: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match outcome {
                PollOutcome::Frame(frame) => match Inbound::parse(&frame) {
                    Ok(msg) => self.handle(msg).await?,
                    Err(e) => warn!("undecodable {} message: {e}", frame.namespace()),
                },
                PollOutcome::PingRequired => self.session.send_ping().await?,
                PollOutcome::Pending | PollOutcome::AwaitingPong => {}
                PollOutcome::Interrupted => {
                    info!("stop requested");
                    self.shutdown().await?;
                }
            }

            self.expire_requests()?;
        }
        Ok(())
    }

    /// Send CLOSE on every open virtual connection and disconnect.
    ///
    /// A CLOSE that cannot be written is logged; the peer may already be gone.
    pub async fn shutdown(&mut self) -> Result<(), SenderError> {
        let transport_id = self.phase.transport_id().map(str::to_owned);
        let destinations = transport_id
            .iter()
            .map(String::as_str)
            .chain([DEFAULT_RECEIVER_ID]);
        for destination in destinations {
            if let Err(e) = self.session.close(destination).await {
                debug!("CLOSE to {destination} not sent: {e}");
                break;
            }
        }
        self.phase.begin_close()?;
        self.session.disconnect().await;
        self.tracker.clear();
        self.phase.finish_close()
    }

    async fn handle(&mut self, msg: Inbound) -> Result<(), SenderError> {
        match msg {
            Inbound::Ping => self.session.send_pong().await?,
            Inbound::Pong => debug!("PONG"),
            Inbound::Close => {
                info!("receiver closed the connection");
                self.phase.force_close();
                self.session.disconnect().await;
            }
            Inbound::ReceiverStatus { request_id, status } => {
                self.resolve(Namespace::Receiver, request_id);
                self.on_receiver_status(&status).await?;
            }
            Inbound::MediaStatus { request_id, status } => {
                self.resolve(Namespace::Media, request_id);
                self.on_media_status(&status).await?;
            }
            Inbound::LaunchError { request_id, reason } => {
                self.resolve(Namespace::Receiver, request_id);
                return Err(SenderError::Rejected {
                    command: Command::Launch,
                    reason: reason.unwrap_or_default(),
                });
            }
            Inbound::LoadFailed { request_id } | Inbound::LoadCancelled { request_id } => {
                self.resolve(Namespace::Media, request_id);
                return Err(SenderError::Rejected {
                    command: Command::Load,
                    reason: "load failed".into(),
                });
            }
            Inbound::InvalidRequest { request_id, reason } => {
                let command = self.resolve(Namespace::Media, request_id);
                warn!(
                    "receiver rejected {}: {}",
                    command.map_or_else(|| "request".to_owned(), |c| c.to_string()),
                    reason.as_deref().unwrap_or("invalid request")
                );
            }
            Inbound::AuthReply(reply) => match reply.error {
                Some(err) => warn!("device authentication error {}", err.error_type),
                None => debug!("device authentication reply received"),
            },
            Inbound::Unknown => debug!("ignoring unhandled message"),
        }
        Ok(())
    }

    async fn on_receiver_status(&mut self, status: &ReceiverStatus) -> Result<(), SenderError> {
        let app = status
            .application(MEDIA_RECEIVER_APP_ID)
            .filter(|app| !app.transport_id.is_empty());

        let awaiting_app = matches!(
            self.phase,
            SenderPhase::AwaitingStatus | SenderPhase::Launching
        );
        let media_up = matches!(
            self.phase,
            SenderPhase::Loading { .. } | SenderPhase::Playing { .. }
        );

        match app {
            Some(app) if awaiting_app => {
                let transport_id = app.transport_id.clone();
                info!("media receiver running on {transport_id}");
                self.session.connect_to(&transport_id).await?;
                let id = self.session.load(&transport_id, &self.load).await?;
                self.tracker.track(id, Command::Load);
                self.phase.begin_load(&transport_id)?;
            }
            None if self.phase == SenderPhase::AwaitingStatus => {
                info!("launching media receiver");
                let id = self.session.launch_app().await?;
                self.tracker.track(id, Command::Launch);
                self.phase.begin_launch()?;
            }
            None if media_up => {
                error!("media receiver app stopped");
                self.shutdown().await?;
            }
            _ => {}
        }
        Ok(())
    }

    /// LOAD goes out with autoplay off, so the first status for a loaded
    /// session that is not already running gets a PLAY.
    async fn on_media_status(&mut self, entries: &[MediaStatusEntry]) -> Result<(), SenderError> {
        let Some(entry) = entries.first() else {
            return Ok(());
        };
        let first_status = matches!(self.phase, SenderPhase::Loading { .. });
        if first_status || matches!(self.phase, SenderPhase::Playing { .. }) {
            if self.phase.media_session_id() != Some(entry.session_id().as_str()) {
                info!("media session {}", entry.media_session_id);
            }
            self.phase.media_ready(entry.session_id())?;
        }
        if first_status && needs_play(entry) {
            if let Some(transport_id) = self.phase.transport_id().map(str::to_owned) {
                let id = self.session.play(&transport_id, &entry.session_id()).await?;
                self.tracker.track(id, Command::Play);
            }
        }
        debug!(
            state = %entry.player_state,
            position = ?entry.current_time,
            "media status"
        );
        Ok(())
    }

    fn resolve(&mut self, namespace: Namespace, request_id: u32) -> Option<Command> {
        self.tracker
            .resolve(namespace, request_id)
            .map(|req| req.command)
    }

    /// Unanswered LAUNCH or LOAD is fatal; anything else is just logged.
    fn expire_requests(&mut self) -> Result<(), SenderError> {
        for ((namespace, id), req) in self.tracker.drain_expired() {
            warn!(
                "{} request {id} on {namespace} unanswered after {:?}",
                req.command,
                req.elapsed()
            );
            if matches!(req.command, Command::Launch | Command::Load) {
                return Err(SenderError::Timeout(req.command));
            }
        }
        Ok(())
    }
}

/// Loaded but not started. An IDLE entry with a reason has already ended.
fn needs_play(entry: &MediaStatusEntry) -> bool {
    match entry.player_state.as_str() {
        "PLAYING" | "BUFFERING" => false,
        "IDLE" => entry.idle_reason.is_none(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castwire_core::{
        CastCodec, Connection, ConnectionInfo, Frame, KeepaliveConfig, Payload, SessionConfig,
    };
    use futures::{SinkExt, StreamExt};
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::DuplexStream;
    use tokio_util::codec::Framed;

    type Receiver = Framed<DuplexStream, CastCodec>;

    fn sender(keepalive: KeepaliveConfig, timeout: Duration) -> (Sender<DuplexStream>, Receiver) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let conn = Connection::from_stream(
            client,
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            ConnectionInfo::new("192.168.1.40", 0),
        );
        let session = CastSession::from_connection(
            conn,
            &SessionConfig {
                keepalive,
                ..Default::default()
            },
        );
        let load = LoadRequest {
            port: 8010,
            title: "Clip".into(),
            artwork: String::new(),
            mime: "video/mp4".into(),
        };
        (
            Sender::new(session, load, timeout),
            Framed::new(server, CastCodec),
        )
    }

    async fn expect(receiver: &mut Receiver, ns: Namespace, kind: &str) -> serde_json::Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), receiver.next())
                .await
                .expect("timeout")
                .expect("stream ended")
                .unwrap();
            if frame.channel() == Some(Namespace::DeviceAuth) {
                continue;
            }
            assert_eq!(frame.channel(), Some(ns));
            let json: serde_json::Value =
                serde_json::from_str(frame.payload().as_text().unwrap()).unwrap();
            assert_eq!(json["type"], kind);
            return json;
        }
    }

    async fn say(receiver: &mut Receiver, ns: Namespace, source: &str, text: &str) {
        receiver
            .send(Frame::new(
                ns.urn(),
                source,
                "sender-0",
                Payload::Text(text.into()),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn full_flow_then_interrupt() {
        let (mut sender, mut rx) = sender(KeepaliveConfig::default(), Duration::from_secs(5));
        let interrupt = sender.session().interrupt_handle();
        sender.start().await.unwrap();

        let device = tokio::spawn(async move {
            expect(&mut rx, Namespace::Connection, "CONNECT").await;
            let json = expect(&mut rx, Namespace::Receiver, "GET_STATUS").await;
            assert_eq!(json["requestId"], 0);
            say(
                &mut rx,
                Namespace::Receiver,
                "receiver-0",
                r#"{"type":"RECEIVER_STATUS","requestId":0,"status":{"applications":[]}}"#,
            )
            .await;

            let json = expect(&mut rx, Namespace::Receiver, "LAUNCH").await;
            assert_eq!(json["requestId"], 1);
            say(
                &mut rx,
                Namespace::Receiver,
                "receiver-0",
                r#"{"type":"RECEIVER_STATUS","requestId":1,"status":{"applications":[
                    {"appId":"CC1AD845","sessionId":"s","transportId":"web-9"}]}}"#,
            )
            .await;

            expect(&mut rx, Namespace::Connection, "CONNECT").await;
            let json = expect(&mut rx, Namespace::Media, "LOAD").await;
            assert_eq!(
                json["media"]["contentId"],
                "http://192.168.1.20:8010/stream"
            );
            say(
                &mut rx,
                Namespace::Media,
                "web-9",
                r#"{"type":"MEDIA_STATUS","requestId":0,"status":[
                    {"mediaSessionId":1,"playerState":"BUFFERING"}]}"#,
            )
            .await;

            say(&mut rx, Namespace::Heartbeat, "receiver-0", r#"{"type":"PING"}"#).await;
            expect(&mut rx, Namespace::Heartbeat, "PONG").await;

            interrupt.interrupt();
            expect(&mut rx, Namespace::Connection, "CLOSE").await;
            expect(&mut rx, Namespace::Connection, "CLOSE").await;
            assert!(rx.next().await.is_none());
        });

        tokio::time::timeout(Duration::from_secs(10), sender.run())
            .await
            .expect("sender did not stop")
            .unwrap();
        device.await.unwrap();

        assert!(sender.phase().is_closed());
        assert_eq!(sender.pending_requests(), 0);
        assert!(!sender.session().is_connected());
    }

    #[tokio::test]
    async fn paused_media_gets_a_play() {
        let (mut sender, mut rx) = sender(KeepaliveConfig::default(), Duration::from_secs(5));
        let interrupt = sender.session().interrupt_handle();
        sender.start().await.unwrap();

        let device = tokio::spawn(async move {
            expect(&mut rx, Namespace::Connection, "CONNECT").await;
            expect(&mut rx, Namespace::Receiver, "GET_STATUS").await;
            say(
                &mut rx,
                Namespace::Receiver,
                "receiver-0",
                r#"{"type":"RECEIVER_STATUS","requestId":0,"status":{"applications":[
                    {"appId":"CC1AD845","sessionId":"s","transportId":"web-4"}]}}"#,
            )
            .await;

            expect(&mut rx, Namespace::Connection, "CONNECT").await;
            let json = expect(&mut rx, Namespace::Media, "LOAD").await;
            assert_eq!(json["autoplay"], false);
            say(
                &mut rx,
                Namespace::Media,
                "web-4",
                r#"{"type":"MEDIA_STATUS","requestId":0,"status":[
                    {"mediaSessionId":7,"playerState":"PAUSED"}]}"#,
            )
            .await;

            let json = expect(&mut rx, Namespace::Media, "PLAY").await;
            assert_eq!(json["mediaSessionId"], 7);
            assert_eq!(json["requestId"], 1);
            say(
                &mut rx,
                Namespace::Media,
                "web-4",
                r#"{"type":"MEDIA_STATUS","requestId":1,"status":[
                    {"mediaSessionId":7,"playerState":"PLAYING"}]}"#,
            )
            .await;

            // A later PAUSED status is the user's doing and is left alone.
            say(
                &mut rx,
                Namespace::Media,
                "web-4",
                r#"{"type":"MEDIA_STATUS","requestId":0,"status":[
                    {"mediaSessionId":7,"playerState":"PAUSED"}]}"#,
            )
            .await;
            say(&mut rx, Namespace::Heartbeat, "receiver-0", r#"{"type":"PING"}"#).await;
            expect(&mut rx, Namespace::Heartbeat, "PONG").await;

            interrupt.interrupt();
            expect(&mut rx, Namespace::Connection, "CLOSE").await;
            expect(&mut rx, Namespace::Connection, "CLOSE").await;
            assert!(rx.next().await.is_none());
        });

        tokio::time::timeout(Duration::from_secs(10), sender.run())
            .await
            .expect("sender did not stop")
            .unwrap();
        device.await.unwrap();
        assert!(sender.phase().is_closed());
    }

    #[test]
    fn play_only_when_not_running() {
        let entry = |state: &str, reason: Option<&str>| MediaStatusEntry {
            media_session_id: 1,
            player_state: state.into(),
            current_time: None,
            idle_reason: reason.map(str::to_owned),
        };
        assert!(needs_play(&entry("PAUSED", None)));
        assert!(needs_play(&entry("IDLE", None)));
        assert!(!needs_play(&entry("BUFFERING", None)));
        assert!(!needs_play(&entry("PLAYING", None)));
        assert!(!needs_play(&entry("IDLE", Some("ERROR"))));
    }

    #[tokio::test]
    async fn interrupt_after_peer_left_still_closes() {
        let (mut sender, rx) = sender(KeepaliveConfig::default(), Duration::from_secs(5));
        let interrupt = sender.session().interrupt_handle();
        sender.start().await.unwrap();
        drop(rx);

        interrupt.interrupt();
        sender.run().await.unwrap();
        assert!(sender.phase().is_closed());
        assert!(!sender.session().is_connected());
        assert_eq!(sender.pending_requests(), 0);
    }

    #[tokio::test]
    async fn launch_error_is_fatal() {
        let (mut sender, mut rx) = sender(KeepaliveConfig::default(), Duration::from_secs(5));
        sender.start().await.unwrap();

        say(
            &mut rx,
            Namespace::Receiver,
            "receiver-0",
            r#"{"type":"RECEIVER_STATUS","requestId":0,"status":{"applications":[]}}"#,
        )
        .await;
        say(
            &mut rx,
            Namespace::Receiver,
            "receiver-0",
            r#"{"type":"LAUNCH_ERROR","requestId":1,"reason":"NOT_FOUND"}"#,
        )
        .await;

        let err = sender.run().await.unwrap_err();
        assert!(matches!(
            err,
            SenderError::Rejected { command: Command::Launch, ref reason } if reason == "NOT_FOUND"
        ));
        assert!(sender.phase().is_closed());
    }

    #[tokio::test]
    async fn unanswered_launch_times_out() {
        let (mut sender, mut rx) = sender(
            KeepaliveConfig {
                ping_interval_ms: 20,
                ping_retries: 1,
                pong_wait_ms: 500,
                pong_retries: 2,
            },
            Duration::from_millis(50),
        );
        sender.start().await.unwrap();
        say(
            &mut rx,
            Namespace::Receiver,
            "receiver-0",
            r#"{"type":"RECEIVER_STATUS","requestId":0,"status":{"applications":[]}}"#,
        )
        .await;

        // Keep answering PINGs so only the request timeout can end the run.
        let device = tokio::spawn(async move {
            while let Some(Ok(frame)) = rx.next().await {
                if frame.payload().as_text() == Some(r#"{"type":"PING"}"#) {
                    say(&mut rx, Namespace::Heartbeat, "receiver-0", r#"{"type":"PONG"}"#).await;
                }
            }
        });

        let err = tokio::time::timeout(Duration::from_secs(5), sender.run())
            .await
            .expect("no timeout reported")
            .unwrap_err();
        assert!(matches!(err, SenderError::Timeout(Command::Launch)));
        device.await.unwrap();
    }

    #[tokio::test]
    async fn receiver_close_ends_the_run() {
        let (mut sender, mut rx) = sender(KeepaliveConfig::default(), Duration::from_secs(5));
        sender.start().await.unwrap();
        say(&mut rx, Namespace::Connection, "receiver-0", r#"{"type":"CLOSE"}"#).await;

        sender.run().await.unwrap();
        assert!(sender.phase().is_closed());
        assert!(!sender.session().is_connected());
    }
}
