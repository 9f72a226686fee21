//! Opening secure streams to receivers.
//!
//! [`Connector`] is the seam between the session and the socket world:
//! production code uses [`TlsConnector`], tests hand the session an
//! in-memory stream instead.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{error, info};

use crate::config::TransportConfig;
use crate::error::CastError;
use crate::network::{Connection, ConnectionInfo};

/// TLS over TCP, as spoken by receivers on the control port.
pub type SecureStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Creates connections to receivers.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn connect(&self, target: &ConnectionInfo) -> Result<Connection<Self::Stream>, CastError>;
}

// ── TlsConnector ─────────────────────────────────────────────────

pub struct TlsConnector {
    config: Arc<ClientConfig>,
    connect_timeout: Duration,
}

impl TlsConnector {
    pub fn new(transport: &TransportConfig) -> Result<Self, CastError> {
        Ok(Self {
            config: Arc::new(client_config(transport.verify_peer)?),
            connect_timeout: transport.connect_timeout(),
        })
    }
}

#[async_trait]
impl Connector for TlsConnector {
    type Stream = SecureStream;

    async fn connect(&self, target: &ConnectionInfo) -> Result<Connection<SecureStream>, CastError> {
        let connect_err = |source: io::Error| CastError::Connect {
            addr: target.to_string(),
            source,
        };

        let tcp = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((target.host(), target.port())),
        )
        .await
        {
            Ok(result) => result.map_err(connect_err)?,
            Err(_) => {
                return Err(connect_err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "connect timed out",
                )));
            }
        };

        let local_ip = match tcp.local_addr() {
            Ok(addr) => addr.ip(),
            Err(e) => {
                error!("cannot get local IP address");
                return Err(connect_err(e));
            }
        };
        tcp.set_nodelay(true).map_err(connect_err)?;

        let server_name = ServerName::try_from(target.host().to_owned())
            .map_err(|e| CastError::Tls(format!("invalid peer name {}: {e}", target.host())))?;

        let stream = tokio_rustls::TlsConnector::from(Arc::clone(&self.config))
            .connect(server_name, tcp)
            .await
            .map_err(|e| {
                error!("failed to create client session with {target}: {e}");
                CastError::Tls(e.to_string())
            })?;

        info!("connected to {target} from {local_ip}");
        Ok(Connection::from_stream(stream, local_ip, target.clone()))
    }
}

fn client_config(verify_peer: bool) -> Result<ClientConfig, CastError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder =
        ClientConfig::builder_with_provider(Arc::clone(&provider)).with_safe_default_protocol_versions()?;

    let config = if verify_peer {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DeviceCertVerifier { provider }))
            .with_no_client_auth()
    };
    Ok(config)
}

// ── DeviceCertVerifier ───────────────────────────────────────────

/// Accepts the receiver's self-signed chain but still checks that the
/// handshake was signed by the presented certificate.
#[derive(Debug)]
struct DeviceCertVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for DeviceCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_both_client_configs() {
        assert!(client_config(false).is_ok());
        assert!(client_config(true).is_ok());
    }

    #[tokio::test]
    async fn refused_port_is_a_connect_error() {
        // Bind then drop so the port is very likely closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = TlsConnector::new(&TransportConfig::default()).unwrap();
        let result = connector
            .connect(&ConnectionInfo::new("127.0.0.1", port))
            .await;
        assert!(matches!(result, Err(CastError::Connect { .. })));
    }

    #[tokio::test]
    async fn non_tls_peer_fails_handshake() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Close without speaking TLS.
            drop(stream);
        });

        let connector = TlsConnector::new(&TransportConfig::default()).unwrap();
        let result = connector
            .connect(&ConnectionInfo::new("127.0.0.1", port))
            .await;
        assert!(matches!(result, Err(CastError::Tls(_))));
        server.await.unwrap();
    }
}
