mod connection;
mod connector;

pub use connection::{Connection, ConnectionInfo};
pub use connector::{Connector, SecureStream, TlsConnector};
