//! Command-line arguments of the headless client.

use clap::Parser;
use drawsync_core::storage::{FileStorage, StorageResult};
use std::path::PathBuf;

/// DrawSync headless canvas client.
///
/// Mirrors a room's canvas and draws from commands typed on stdin.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "drawsync",
    version,
    about = "DrawSync headless canvas client",
    long_about = "Join a DrawSync room, mirror its canvas and draw from commands on stdin.\n\n\
                  Example:\n  \
                  drawsync --room ABC123 --name alice\n  \
                  > line 10 10 50 50\n  \
                  > save canvas.png"
)]
pub struct ClientArgs {
    /// Relay WebSocket URL.
    #[arg(long, env = "DRAWSYNC_URL", default_value = "ws://localhost:3030/ws", value_name = "URL")]
    pub url: String,

    /// Room code to join. Without one the client stays offline.
    #[arg(short, long, value_name = "CODE")]
    pub room: Option<String>,

    /// Display name announced to the room.
    #[arg(short, long, default_value = "anonymous")]
    pub name: String,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 800, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Directory holding the persisted canvas. Defaults to the platform data directory.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Where `save` writes the PNG export when no path is given.
    #[arg(short, long, default_value = "drawsync.png", value_name = "FILE")]
    pub output: PathBuf,
}

impl ClientArgs {
    /// Open the snapshot store in `--data-dir` or the default location.
    pub fn storage(&self) -> StorageResult<FileStorage> {
        match &self.data_dir {
            Some(dir) => FileStorage::new(dir.clone()),
            None => FileStorage::default_location(),
        }
    }
}
