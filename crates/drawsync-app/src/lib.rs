//! DrawSync client.
//!
//! [`Session`] ties one participant's canvas, history, presence and chat to
//! the relay protocol; the `drawsync` binary drives it from stdin.

pub mod command;
pub mod config;
pub mod session;

pub use command::{Command, CommandError, Flow};
pub use config::ClientArgs;
pub use session::{Session, SessionError, SessionResult};
