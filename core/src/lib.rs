pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod normalize;
pub mod schema;
pub mod source;
pub mod statement;
pub mod value;

pub use db::{Pool, PoolConfig, PoolConnection, PoolState, QueryResult, ResultMeta};
pub use error::Error;
pub use value::{FromRow, Row, Value};
