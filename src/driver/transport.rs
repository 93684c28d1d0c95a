//! The pluggable byte transport under a connection.
//!
//! The protocol core only needs an ordered byte stream. Production
//! connections use a plain [`TcpStream`]; tests substitute in-memory duplex
//! pipes, and an embedding application can supply a TLS stream configured
//! from [`Config::tls`](super::config::TlsOptions) the same way.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time;

use crate::error::Result;

use super::config::Config;

/// An ordered, reliable byte stream a connection can run over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Dial a plain TCP transport for the given configuration, honoring its
/// `dial_timeout`.
pub async fn connect_tcp(config: &Config) -> Result<TcpStream> {
    let addr = config.address();
    let connect = TcpStream::connect(&addr);
    let stream = match config.dial_timeout {
        Some(timeout) => time::timeout(timeout, connect)
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??,
        None => connect.await?,
    };
    stream.set_nodelay(true).ok();
    Ok(stream)
}
