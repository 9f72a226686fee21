use std::fmt;
use std::net::IpAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::CastError;
use crate::namespace::DEFAULT_CONTROL_PORT;

/// A secure stream to a single receiver.
///
/// The stream owns both the socket and the TLS session, so either both
/// exist or neither does. Once [`disconnect`](Self::disconnect) has run
/// every I/O call fails with [`CastError::NotConnected`].
#[derive(Debug)]
pub struct Connection<S> {
    stream: Option<S>,
    local_ip: IpAddr,
    peer: ConnectionInfo,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-established stream.
    ///
    /// `local_ip` is the address this side of the socket is bound to;
    /// the receiver fetches the media stream from it.
    pub fn from_stream(stream: S, local_ip: IpAddr, peer: ConnectionInfo) -> Self {
        Self {
            stream: Some(stream),
            local_ip,
            peer,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Local address observed when the socket was opened.
    pub fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    pub fn peer(&self) -> &ConnectionInfo {
        &self.peer
    }

    /// One write of `bytes`, then a flush. Returns how many were accepted,
    /// which may be fewer than `bytes.len()`.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<usize, CastError> {
        let stream = self.stream.as_mut().ok_or(CastError::NotConnected)?;
        let n = stream.write(bytes).await?;
        stream.flush().await?;
        Ok(n)
    }

    /// Read whatever is available into `buf`. Zero means end of stream.
    pub async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, CastError> {
        let stream = self.stream.as_mut().ok_or(CastError::NotConnected)?;
        Ok(stream.read(buf).await?)
    }

    /// Close the TLS session and the socket. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("shutdown of {} failed: {e}", self.peer);
            }
        }
    }
}

/// Where a receiver listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    /// Port 0 selects [`DEFAULT_CONTROL_PORT`].
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let port = if port == 0 { DEFAULT_CONTROL_PORT } else { port };
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
