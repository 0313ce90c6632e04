//! Chat front-end: one session talking to the relay.

mod format;
mod session;
mod terminal;
mod transport;

pub use terminal::run_chat;
pub use transport::TransportError;
