mod connection;
mod server;

pub use server::{DwgServer, ServerEvent};
