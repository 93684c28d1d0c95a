//! Driver error types.

use std::io;

use thiserror::Error;

use crate::bolt::packstream::PackStreamError;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of driver errors.
#[derive(Error, Debug)]
pub enum Error {
    /// The connection is poisoned; every further operation short-circuits
    /// with this.
    #[error("connection is in a bad state")]
    BadConnection,

    /// Malformed chunk lengths or a missing message terminator.
    #[error("framing error: {0}")]
    Framing(String),

    /// PackStream serialization error.
    #[error("codec error: {0}")]
    Codec(#[from] PackStreamError),

    /// No common protocol version with the server.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// INIT was rejected by the server.
    #[error("authentication failed: {code}: {message}")]
    Auth {
        /// Server failure code
        code: String,
        /// Server failure message
        message: String,
    },

    /// A response type not expected at this protocol point.
    #[error("unrecognized response from server: {0}")]
    UnrecognizedResponse(String),

    /// The server answered a request with FAILURE.
    #[error("server failure: {code}: {message}")]
    Server {
        /// Server failure code
        code: String,
        /// Server failure message
        message: String,
    },

    /// Operation requires or forbids an in-transaction context incompatible
    /// with the connection's current status.
    #[error("unexpected transaction status: {0}")]
    TxState(String),

    /// COMMIT was attempted inside a failed transaction; the transaction has
    /// been rolled back.
    #[error("operation inside failed transaction")]
    InFailedTransaction,

    /// Caller-supplied parameters could not be marshalled.
    #[error(transparent)]
    Arg(#[from] ArgError),

    /// The rows have already been closed.
    #[error("rows have been closed")]
    RowsClosed,

    /// The statement has already been closed.
    #[error("statement is closed")]
    StatementClosed,

    /// Driver configuration error (URI, environment).
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket-level failure. Timed-out socket operations surface as
    /// [`Error::BadConnection`] instead, having poisoned the connection.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Argument marshalling errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgError {
    /// A single argument must be a map
    #[error("single argument must be a map")]
    NotMap,
    /// Key/value argument sequences must have even length
    #[error("odd number of arguments")]
    OddLength,
    /// Even-positioned arguments are keys and must be strings
    #[error("argument keys must be strings")]
    KeyNotString,
    /// Named arguments must have non-empty names
    #[error("argument names must not be empty")]
    EmptyKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::BadConnection.to_string(),
            "connection is in a bad state"
        );
        assert_eq!(Error::RowsClosed.to_string(), "rows have been closed");
        assert_eq!(
            Error::Server {
                code: "Neo.ClientError.Statement.SyntaxError".into(),
                message: "bad input".into(),
            }
            .to_string(),
            "server failure: Neo.ClientError.Statement.SyntaxError: bad input"
        );
    }

    #[test]
    fn test_from_packstream() {
        let err: Error = PackStreamError::UnexpectedEof.into();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_from_io() {
        let err: Error = io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_arg_error_display() {
        assert_eq!(
            Error::from(ArgError::OddLength).to_string(),
            "odd number of arguments"
        );
    }
}
