//! A scripted Bolt v1 server for driving the client over in-memory pipes.
//!
//! Plays the server half of a session over a `tokio::io::duplex` pair, one
//! scripted exchange at a time, standing in for a real database at the
//! transport boundary.

#![allow(dead_code)]

use std::collections::HashMap;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::codec::{Decoder, Encoder};

use bolt_driver::bolt::codec::BoltCodec;
use bolt_driver::bolt::handshake::BOLT_MAGIC;
use bolt_driver::bolt::message::{Failure, Record, Request, Response, Run, Success};
use bolt_driver::{Config, Connection, Value};

pub struct ScriptedServer {
    stream: DuplexStream,
    codec: BoltCodec,
    buf: BytesMut,
}

impl ScriptedServer {
    /// Accept the client preamble and select protocol version 1.
    pub async fn handshake(stream: DuplexStream) -> Self {
        Self::handshake_with_selection(stream, [0, 0, 0, 1]).await
    }

    /// Accept the client preamble and answer with an arbitrary selection.
    pub async fn handshake_with_selection(mut stream: DuplexStream, selection: [u8; 4]) -> Self {
        let mut preamble = [0u8; 20];
        stream.read_exact(&mut preamble).await.unwrap();
        assert_eq!(&preamble[0..4], &BOLT_MAGIC, "bad magic");
        assert_eq!(&preamble[4..8], &[0, 0, 0, 1], "expected version 1 proposal");
        stream.write_all(&selection).await.unwrap();
        stream.flush().await.unwrap();

        Self {
            stream,
            codec: BoltCodec::new(),
            buf: BytesMut::with_capacity(8192),
        }
    }

    /// Chunk size for responses sent from here on.
    pub fn set_chunk_size(&mut self, size: u16) {
        self.codec.set_chunk_size(size);
    }

    /// Read the next request from the client.
    pub async fn recv_request(&mut self) -> Request {
        loop {
            if let Some(value) = self.codec.decode(&mut self.buf).unwrap() {
                let structure = value.as_structure().expect("request must be a structure");
                return Request::from_structure(structure).unwrap();
            }
            let n = self.stream.read_buf(&mut self.buf).await.unwrap();
            assert!(n > 0, "client closed mid-request");
        }
    }

    /// Read a request and require it to be RUN.
    pub async fn expect_run(&mut self) -> Run {
        match self.recv_request().await {
            Request::Run(run) => run,
            other => panic!("expected RUN, got {}", other.name()),
        }
    }

    /// Read a request and require it to be INIT; answer SUCCESS.
    pub async fn expect_init(&mut self) {
        match self.recv_request().await {
            Request::Init(_) => {}
            other => panic!("expected INIT, got {}", other.name()),
        }
        self.send(success([("server", Value::String("ScriptedBolt/1.0".into()))]))
            .await;
    }

    /// Read a request and require the given fieldless kind.
    pub async fn expect(&mut self, name: &str) {
        let request = self.recv_request().await;
        assert_eq!(request.name(), name);
    }

    /// Frame and send one response.
    pub async fn send(&mut self, response: Response) {
        let mut out = BytesMut::new();
        self.codec
            .encode(Value::Structure(response.to_structure()), &mut out)
            .unwrap();
        self.stream.write_all(&out).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Serve one RUN + PULL_ALL (or DISCARD_ALL) exchange: header SUCCESS,
    /// the given records, then the terminal.
    pub async fn serve_statement(
        &mut self,
        columns: &[&str],
        records: Vec<Vec<Value>>,
        terminal: Response,
    ) -> Run {
        let run = self.expect_run().await;
        self.recv_request().await; // PULL_ALL or DISCARD_ALL
        self.send(fields_success(columns)).await;
        for values in records {
            self.send(Response::Record(Record::new(values))).await;
        }
        self.send(terminal).await;
        run
    }

    /// Serve one transaction-control exchange (BEGIN/COMMIT/ROLLBACK):
    /// RUN + PULL_ALL answered with two SUCCESSes.
    pub async fn serve_tx_control(&mut self, keyword: &str) {
        let run = self.expect_run().await;
        assert_eq!(run.statement, keyword);
        self.expect("PULL_ALL").await;
        self.send(success([])).await;
        self.send(success([])).await;
    }

    /// Serve a failing RUN: FAILURE for the statement, IGNORED for its
    /// companion, then SUCCESS once the client acknowledges.
    pub async fn serve_failure(&mut self, code: &str, message: &str) -> Run {
        let run = self.expect_run().await;
        self.recv_request().await; // companion PULL_ALL / DISCARD_ALL
        self.send(Response::Failure(Failure::new(code, message))).await;
        self.send(Response::Ignored).await;
        self.expect("ACK_FAILURE").await;
        self.send(success([])).await;
        run
    }
}

/// A SUCCESS response with the given metadata entries.
pub fn success<const N: usize>(entries: [(&str, Value); N]) -> Response {
    let metadata: HashMap<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Response::Success(Success::with_metadata(metadata))
}

/// The header SUCCESS naming the result columns.
pub fn fields_success(columns: &[&str]) -> Response {
    success([(
        "fields",
        Value::List(columns.iter().map(|c| Value::String(c.to_string())).collect()),
    )])
}

/// The terminal SUCCESS with a statement type and timing.
pub fn summary_success(statement_type: &str) -> Response {
    success([
        ("type", Value::String(statement_type.to_string())),
        ("result_available_after", Value::Integer(1)),
        ("result_consumed_after", Value::Integer(2)),
    ])
}

/// One RECORD response.
pub fn record(values: Vec<Value>) -> Response {
    Response::Record(Record::new(values))
}

/// Establish a connection against a scripted server with default
/// configuration (anonymous auth, no timeouts).
pub async fn connect() -> (Connection, ScriptedServer) {
    connect_with(Config::default()).await
}

/// Establish a connection against a scripted server.
pub async fn connect_with(config: Config) -> (Connection, ScriptedServer) {
    let (client, server) = tokio::io::duplex(1 << 20);
    let server_side = async {
        let mut srv = ScriptedServer::handshake(server).await;
        srv.expect_init().await;
        srv
    };
    let client_side = Connection::with_transport(Box::new(client), &config);
    let (conn, srv) = tokio::join!(client_side, server_side);
    (conn.unwrap(), srv)
}
