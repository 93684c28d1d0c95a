//! Bolt connection and its state machine.
//!
//! A connection owns a byte transport, performs the version handshake and
//! INIT exchange, and then runs the request/response pipeline: requests go
//! out in order, one terminal response is consumed per request in that same
//! order, and FAILURE responses are acknowledged (ACK_FAILURE, escalating to
//! RESET) so the session stays usable.
//!
//! A connection is single-owner. It never serializes its own requests;
//! higher layers provide pooling and exclusive checkout.

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::bolt::codec::ResponseCodec;
use crate::bolt::handshake;
use crate::bolt::message::{AuthToken, Init, Record, Request, Response, Run};
use crate::error::{Error, Result};

use super::args::Params;
use super::config::Config;
use super::transport::{self, Transport};
use super::CLIENT_AGENT;

/// Transaction status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// No transaction open
    Idle,
    /// Inside an open transaction
    InTx,
    /// Inside a transaction that has failed and must be rolled back
    InBadTx,
}

/// A single Bolt session over one socket.
pub struct Connection {
    stream: Box<dyn Transport>,
    codec: ResponseCodec,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    timeout: Option<Duration>,
    status: TxStatus,
    bad: bool,
}

impl Connection {
    /// Dial, handshake, and authenticate against the given URI.
    pub async fn connect(uri: &str) -> Result<Self> {
        let config = Config::from_uri(uri)?;
        let stream = transport::connect_tcp(&config).await?;
        Self::with_transport(Box::new(stream), &config).await
    }

    /// Run the handshake and INIT exchange over an already-established
    /// transport. This is the seam where tests and TLS dialers plug in.
    pub async fn with_transport(stream: Box<dyn Transport>, config: &Config) -> Result<Self> {
        let mut conn = Self {
            stream,
            codec: ResponseCodec::new(),
            read_buffer: BytesMut::with_capacity(8192),
            write_buffer: BytesMut::with_capacity(8192),
            timeout: config.timeout,
            status: TxStatus::Idle,
            bad: false,
        };

        if let Err(err) = conn.handshake().await {
            let _ = conn.stream.shutdown().await;
            return Err(err);
        }
        if let Err(err) = conn.init(&config.username, &config.password).await {
            let _ = conn.stream.shutdown().await;
            return Err(err);
        }
        Ok(conn)
    }

    /// Send the 20-byte preamble and validate the server's selection.
    async fn handshake(&mut self) -> Result<()> {
        let proposal = handshake::proposal();
        let timeout = self.timeout;
        timed(timeout, self.stream.write_all(&proposal)).await?;
        timed(timeout, self.stream.flush()).await?;

        let mut selection = [0u8; handshake::HANDSHAKE_RESPONSE_SIZE];
        timed(timeout, self.stream.read_exact(&mut selection)).await?;

        let version = handshake::parse_selection(selection)?;
        debug!(version, "handshake complete");
        Ok(())
    }

    /// Authenticate. Anything but SUCCESS is fatal: the socket is closed
    /// rather than acknowledged, since the failure discipline only applies
    /// to an authenticated session.
    async fn init(&mut self, username: &str, password: &str) -> Result<()> {
        let auth = if username.is_empty() {
            AuthToken::none()
        } else {
            AuthToken::basic(username, password)
        };
        self.send(&Request::Init(Init::new(CLIENT_AGENT, auth)))
            .await?;

        match self.recv().await? {
            Response::Success(_) => {
                debug!("authenticated");
                Ok(())
            }
            Response::Failure(f) => {
                self.bad = true;
                Err(Error::Auth {
                    code: f.code().to_string(),
                    message: f.message().to_string(),
                })
            }
            other => Err(self.fatal_unrecognized(&other)),
        }
    }

    /// Encode and write one request.
    pub(crate) async fn send(&mut self, request: &Request) -> Result<()> {
        self.write_buffer.clear();
        if let Err(err) = self.codec.encode(request, &mut self.write_buffer) {
            self.bad = true;
            return Err(err);
        }
        trace!(message = request.name(), "send");

        let timeout = self.timeout;
        let result = timed(timeout, async {
            self.stream.write_all(&self.write_buffer).await?;
            self.stream.flush().await
        })
        .await;

        if let Err(err) = result {
            self.bad = true;
            return Err(err);
        }
        Ok(())
    }

    /// Read one response, blocking until a whole message is framed.
    pub(crate) async fn recv(&mut self) -> Result<Response> {
        loop {
            match self.codec.decode(&mut self.read_buffer) {
                Ok(Some(response)) => {
                    trace!(message = response.name(), "recv");
                    return Ok(response);
                }
                Ok(None) => {}
                Err(err) => {
                    self.bad = true;
                    return Err(err);
                }
            }

            let timeout = self.timeout;
            let read = timed(timeout, self.stream.read_buf(&mut self.read_buffer)).await;
            match read {
                Ok(0) => {
                    self.bad = true;
                    return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
                }
                Ok(_) => {}
                Err(err) => {
                    self.bad = true;
                    return Err(err);
                }
            }
        }
    }

    /// Read the next response, acknowledging a FAILURE so the connection
    /// stays usable. The FAILURE itself is still returned to the caller.
    pub(crate) async fn consume(&mut self) -> Result<Response> {
        let response = self.recv().await?;
        if matches!(response, Response::Failure(_)) {
            self.ack_failure().await?;
            if self.status == TxStatus::InTx {
                self.status = TxStatus::InBadTx;
            }
        }
        Ok(response)
    }

    /// Consume records until the stream's terminal response.
    pub(crate) async fn consume_all(&mut self) -> Result<(Vec<Record>, Response)> {
        let mut records = Vec::new();
        loop {
            match self.consume().await? {
                Response::Record(record) => records.push(record),
                terminal => return Ok((records, terminal)),
            }
        }
    }

    /// Acknowledge a FAILURE: send ACK_FAILURE, drain the IGNOREDs it left
    /// behind, and expect SUCCESS. A second FAILURE escalates to RESET.
    async fn ack_failure(&mut self) -> Result<()> {
        self.send(&Request::AckFailure).await?;

        loop {
            match self.recv().await? {
                Response::Ignored => {}
                Response::Success(_) => {
                    debug!("failure acknowledged");
                    return Ok(());
                }
                Response::Failure(_) => {
                    warn!("ACK_FAILURE rejected, resetting session");
                    return self.reset().await;
                }
                other => return Err(self.fatal_unrecognized(&other)),
            }
        }
    }

    /// Clear the session server-side. Failure of RESET poisons the
    /// connection.
    async fn reset(&mut self) -> Result<()> {
        self.send(&Request::Reset).await?;

        loop {
            match self.recv().await? {
                Response::Ignored => {}
                Response::Success(_) => {
                    debug!("session reset");
                    return Ok(());
                }
                Response::Failure(f) => {
                    self.bad = true;
                    return Err(Error::Server {
                        code: f.code().to_string(),
                        message: f.message().to_string(),
                    });
                }
                other => return Err(self.fatal_unrecognized(&other)),
            }
        }
    }

    /// Begin a transaction.
    pub async fn begin(&mut self) -> Result<()> {
        self.guard()?;
        self.check_tx(false)?;
        self.transac(TxStatement::Begin).await?;
        self.status = TxStatus::InTx;
        Ok(())
    }

    /// Commit the open transaction. Inside a failed transaction the
    /// transaction is rolled back instead and `InFailedTransaction` is
    /// reported.
    pub async fn commit(&mut self) -> Result<()> {
        self.guard()?;
        self.check_tx(true)?;
        if self.status == TxStatus::InBadTx {
            self.rollback().await?;
            return Err(Error::InFailedTransaction);
        }
        self.transac(TxStatement::Commit).await?;
        self.status = TxStatus::Idle;
        Ok(())
    }

    /// Roll back the open transaction.
    pub async fn rollback(&mut self) -> Result<()> {
        self.guard()?;
        self.check_tx(true)?;
        self.transac(TxStatement::Rollback).await?;
        self.status = TxStatus::Idle;
        Ok(())
    }

    /// Execute one transaction-control statement as an ordinary RUN +
    /// PULL_ALL pair.
    async fn transac(&mut self, statement: TxStatement) -> Result<()> {
        debug!(statement = statement.as_str(), "transaction control");
        self.send(&Request::Run(Run::new(statement.as_str(), Params::new())))
            .await?;
        self.send(&Request::PullAll).await?;

        // If RUN failed, the PULL_ALL reply was an IGNORED already drained
        // by the acknowledgement; there is nothing further to consume.
        match self.consume().await? {
            Response::Success(_) => {}
            Response::Failure(f) => return Err(server_failure(&f)),
            other => return Err(self.fatal_unrecognized(&other)),
        }

        match self.consume().await? {
            Response::Success(_) => Ok(()),
            Response::Failure(f) => Err(server_failure(&f)),
            other => Err(self.fatal_unrecognized(&other)),
        }
    }

    /// Fail unless the transaction status matches the expectation; a
    /// mismatch poisons the connection.
    pub(crate) fn check_tx(&mut self, expect_in_tx: bool) -> Result<()> {
        let in_tx = matches!(self.status, TxStatus::InTx | TxStatus::InBadTx);
        if in_tx != expect_in_tx {
            self.bad = true;
            return Err(Error::TxState(format!("{:?}", self.status)));
        }
        Ok(())
    }

    /// Short-circuit every operation once the connection is poisoned.
    pub(crate) fn guard(&self) -> Result<()> {
        if self.bad {
            return Err(Error::BadConnection);
        }
        Ok(())
    }

    /// Poison the connection over a response that has no business arriving
    /// at this protocol point.
    pub(crate) fn fatal_unrecognized(&mut self, response: &Response) -> Error {
        self.bad = true;
        Error::UnrecognizedResponse(response.name().to_string())
    }

    /// Close the connection. The socket is shut down and the connection is
    /// unusable afterwards.
    pub async fn close(&mut self) -> Result<()> {
        if self.bad {
            return Err(Error::BadConnection);
        }
        self.status = TxStatus::Idle;
        self.bad = true;
        self.stream.shutdown().await?;
        Ok(())
    }

    /// The current transaction status.
    pub fn status(&self) -> TxStatus {
        self.status
    }

    /// Whether the connection is poisoned.
    pub fn is_bad(&self) -> bool {
        self.bad
    }

    /// Set the outbound chunk size for subsequent messages.
    pub fn set_chunk_size(&mut self, chunk_size: u16) {
        self.codec.set_chunk_size(chunk_size);
    }

    /// Set the per-operation read/write timeout. `None` disables deadlines.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status)
            .field("bad", &self.bad)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub(crate) fn server_failure(f: &crate::bolt::message::Failure) -> Error {
    Error::Server {
        code: f.code().to_string(),
        message: f.message().to_string(),
    }
}

/// Re-arm a deadline around one socket operation. A missed deadline
/// surfaces as `BadConnection`; the call sites set the poison flag.
async fn timed<T>(
    timeout: Option<Duration>,
    op: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    match timeout {
        Some(t) => match time::timeout(t, op).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::BadConnection),
        },
        None => Ok(op.await?),
    }
}

enum TxStatement {
    Begin,
    Commit,
    Rollback,
}

impl TxStatement {
    fn as_str(&self) -> &'static str {
        match self {
            TxStatement::Begin => "BEGIN",
            TxStatement::Commit => "COMMIT",
            TxStatement::Rollback => "ROLLBACK",
        }
    }
}
