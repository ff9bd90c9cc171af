//! WebSocket transport: connection accept loop, message send/serialize
//! helper, and HTTP route assembly.

mod connection;
mod sending;

pub mod routes;

pub use routes::{create_router, run_server};
