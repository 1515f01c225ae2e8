//! Tool-call server exposing the snapshot store over stdio.

pub mod handlers;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod tools;

pub use handlers::{dispatch, HandlerState};
pub use registry::ToolRegistry;
pub use server::{serve, serve_channel, serve_stdio};
