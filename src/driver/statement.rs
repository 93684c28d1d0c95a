//! Statements and row streams.
//!
//! A query is RUN followed by PULL_ALL; an execution is RUN followed by
//! DISCARD_ALL. Both consume two terminal responses in order: the header
//! SUCCESS names the columns, the stream terminal carries the summary.
//! At most one statement is in flight per connection.

use tracing::debug;

use crate::bolt::message::{Request, Response, Run};
use crate::bolt::packstream::Value;
use crate::error::{Error, Result};

use super::args::Params;
use super::connection::{server_failure, Connection};
use super::summary::Summary;

impl Connection {
    /// Prepare a statement for later execution. The statement borrows the
    /// connection exclusively; only one can exist at a time.
    pub fn prepare(&mut self, query: &str) -> Statement<'_> {
        Statement {
            conn: self,
            query: query.to_string(),
            closed: false,
        }
    }

    /// Run a query and stream its rows.
    pub async fn query(&mut self, query: &str, params: Params) -> Result<Rows<'_>> {
        let header = start(self, query, params, true).await?;

        let columns = header.fields().unwrap_or_default();
        let mut summary = Summary {
            query: query.to_string(),
            ..Summary::default()
        };
        summary.parse_success(&header.metadata);

        Ok(Rows {
            conn: self,
            columns,
            summary,
            finished: false,
            closed: false,
        })
    }

    /// Run a statement for effect, discarding any rows, and return its
    /// summary once the server confirms completion.
    pub async fn execute(&mut self, query: &str, params: Params) -> Result<Summary> {
        let header = start(self, query, params, false).await?;

        let mut summary = Summary {
            query: query.to_string(),
            ..Summary::default()
        };
        summary.parse_success(&header.metadata);

        let (discarded, terminal) = self.consume_all().await?;
        if !discarded.is_empty() {
            debug!(count = discarded.len(), "records discarded by server anyway");
        }
        match terminal {
            Response::Success(s) => {
                summary.parse_success(&s.metadata);
                Ok(summary)
            }
            Response::Failure(f) => Err(server_failure(&f)),
            other => Err(self.fatal_unrecognized(&other)),
        }
    }
}

/// Send RUN plus its companion request and consume the header response.
///
/// On a header FAILURE the companion's IGNORED reply has already been
/// drained by the failure acknowledgement, so the connection is back at a
/// message boundary when this returns an error.
async fn start(
    conn: &mut Connection,
    query: &str,
    params: Params,
    stream: bool,
) -> Result<crate::bolt::message::Success> {
    conn.guard()?;

    conn.send(&Request::Run(Run::new(query, params))).await?;
    let companion = if stream {
        Request::PullAll
    } else {
        Request::DiscardAll
    };
    conn.send(&companion).await?;

    match conn.consume().await? {
        Response::Success(header) => Ok(header),
        Response::Failure(f) => Err(server_failure(&f)),
        other => Err(conn.fatal_unrecognized(&other)),
    }
}

/// A prepared statement bound to its connection.
pub struct Statement<'c> {
    conn: &'c mut Connection,
    query: String,
    closed: bool,
}

impl<'c> Statement<'c> {
    /// Run the statement and stream its rows.
    pub async fn query(&mut self, params: Params) -> Result<Rows<'_>> {
        if self.closed {
            return Err(Error::StatementClosed);
        }
        let query = self.query.clone();
        self.conn.query(&query, params).await
    }

    /// Run the statement for effect and return its summary.
    pub async fn execute(&mut self, params: Params) -> Result<Summary> {
        if self.closed {
            return Err(Error::StatementClosed);
        }
        let query = self.query.clone();
        self.conn.execute(&query, params).await
    }

    /// Close the statement. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.conn.guard()?;
        self.closed = true;
        Ok(())
    }

    /// The statement text.
    pub fn query_text(&self) -> &str {
        &self.query
    }
}

/// A streaming result.
///
/// Rows arrive as RECORD messages and end at a terminal SUCCESS carrying the
/// summary. Dropping a `Rows` without calling [`Rows::close`] leaves unread
/// responses on the connection; always close (or fully drain) the stream
/// before issuing the next statement.
pub struct Rows<'c> {
    conn: &'c mut Connection,
    columns: Vec<String>,
    summary: Summary,
    finished: bool,
    closed: bool,
}

impl<'c> std::fmt::Debug for Rows<'c> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.columns)
            .field("summary", &self.summary)
            .field("finished", &self.finished)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<'c> Rows<'c> {
    /// The column names from the header response.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fetch the next row, or `None` once the stream has ended.
    ///
    /// Graph entities pass through as [`Value::Structure`]; use the typed
    /// wrappers in [`crate::bolt::packstream`] to unpack them.
    pub async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        if self.closed {
            return Err(Error::RowsClosed);
        }
        if self.finished {
            return Ok(None);
        }

        match self.conn.consume().await? {
            Response::Record(record) => Ok(Some(record.values)),
            Response::Success(s) => {
                self.summary.parse_success(&s.metadata);
                self.finished = true;
                Ok(None)
            }
            Response::Failure(f) => {
                // The acknowledgement already ran; the stream is over.
                self.finished = true;
                Err(server_failure(&f))
            }
            other => Err(self.conn.fatal_unrecognized(&other)),
        }
    }

    /// Close the stream, draining any unread tail so the connection returns
    /// to message-aligned idle. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if !self.finished {
            let (discarded, terminal) = self.conn.consume_all().await?;
            if !discarded.is_empty() {
                debug!(count = discarded.len(), "discarded unread rows");
            }
            match terminal {
                Response::Success(s) => self.summary.parse_success(&s.metadata),
                Response::Failure(_) => {}
                other => return Err(self.conn.fatal_unrecognized(&other)),
            }
            self.finished = true;
        }
        self.closed = true;
        Ok(())
    }

    /// The query summary, available once the stream has finished (by
    /// reading to the end or closing).
    pub fn summary(&self) -> Option<&Summary> {
        self.finished.then_some(&self.summary)
    }
}
