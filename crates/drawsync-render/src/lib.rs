//! DrawSync Render Library
//!
//! CPU raster surface shared by local and remote drawing, the render
//! dispatch over draw operations, PNG snapshots, and the client-side
//! replication and undo/redo engines built on them.

pub mod history;
pub mod replication;
mod renderer;
pub mod snapshot;
pub mod surface;

pub use history::{DEFAULT_HISTORY_LIMIT, HistoryError, HistoryManager};
pub use renderer::{RenderError, RenderResult, Renderable, render};
pub use replication::ReplicationEngine;
pub use snapshot::Snapshot;
pub use surface::Surface;
