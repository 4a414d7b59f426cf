use std::time::Duration;

use thiserror::Error;

use crate::db::PoolState;

/// Errors raised by the query layer.
///
/// Engine errors are carried unchanged in [`Error::Postgres`] and
/// [`Error::Sqlite`]; everything else describes the pool itself.
#[derive(Debug, Error)]
pub enum Error {
    /// `end()` has been called; the pool accepts no more work.
    #[error("connection pool is closed")]
    PoolClosed,

    /// The pool has not finished its start-up probe yet.
    #[error("connection pool is not ready (state: {0:?})")]
    NotReady(PoolState),

    /// No connection became available within the configured timeout.
    #[error("timed out after {waited:?} waiting for a connection to {target}")]
    ConnectionTimeout { target: String, waited: Duration },

    /// A new connection could not be established.
    #[error("could not connect to {target}")]
    Connect {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A pooled connection was found dead when handed back out.
    #[error("connection to the database was lost")]
    ConnectionLost,

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid connection url: {0}")]
    InvalidUrl(String),

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("cannot decode row: {0}")]
    Decode(String),

    #[error("connection pool error: {0}")]
    Pool(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// True for failures that mean the database cannot be reached at all.
    ///
    /// An import run aborts on these; any other error only fails the
    /// statement that produced it.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::PoolClosed
            | Error::NotReady(_)
            | Error::ConnectionTimeout { .. }
            | Error::Connect { .. }
            | Error::ConnectionLost => true,
            Error::Postgres(err) => {
                err.is_closed()
                    || (err.as_db_error().is_none()
                        && std::error::Error::source(err)
                            .is_some_and(|source| source.is::<std::io::Error>()))
            }
            Error::Sqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::CannotOpen | rusqlite::ErrorCode::NotADatabase)
            ),
            Error::InvalidUrl(_)
            | Error::InvalidIdentifier(_)
            | Error::Decode(_)
            | Error::Pool(_) => false,
        }
    }
}
