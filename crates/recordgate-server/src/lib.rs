//! Authenticated record-retrieval connector
//!
//! A small HTTP service exposing one tool, `get_last_n_records`, over a
//! JSON-RPC envelope. The tool endpoint sits behind exactly one
//! authentication strategy chosen at startup: a pre-shared static key, a
//! browser OAuth2 session, or JWKS-validated bearer JWTs. Strategy internals
//! live in `recordgate-auth`; this crate wires them to the wire.

pub mod config;
pub mod dispatch;
pub mod logging;
pub mod records;
pub mod routes;

pub use config::{AuthMode, ConfigError, ServerConfig};
pub use dispatch::{ToolDispatcher, TOOL_GET_LAST_N_RECORDS};
pub use records::{CsvRecordStore, RecordStore, RecordStoreError};
pub use routes::{router, AppState, LOGIN_PATH, SESSION_COOKIE};
