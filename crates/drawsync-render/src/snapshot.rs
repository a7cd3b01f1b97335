//! Full-canvas raster snapshots.
//!
//! A snapshot is the PNG encoding of the whole surface. It is kept in the
//! undo/redo stacks and persisted as a `data:` URL; it never goes over the
//! network.

use crate::renderer::{RenderError, RenderResult};
use crate::surface::Surface;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbaImage};
use std::fmt;
use std::io::Cursor;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// An encoded raster image of the canvas at one point in time.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    png: Vec<u8>,
}

impl Snapshot {
    /// Encode the current content of `surface`.
    pub fn capture(surface: &Surface) -> RenderResult<Self> {
        let mut png = Vec::new();
        surface
            .pixels()
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self { png })
    }

    /// Decode back to pixels.
    pub fn decode(&self) -> RenderResult<RgbaImage> {
        let image = image::load_from_memory_with_format(&self.png, ImageFormat::Png)?;
        Ok(image.into_rgba8())
    }

    /// Encode as a `data:image/png;base64,...` URL for persistence.
    pub fn to_data_url(&self) -> String {
        format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(&self.png))
    }

    /// Parse a persisted data URL. The PNG payload is checked by decoding it.
    pub fn from_data_url(url: &str) -> RenderResult<Self> {
        let encoded = url.trim().strip_prefix(DATA_URL_PREFIX).ok_or_else(|| {
            let head: String = url.chars().take(32).collect();
            RenderError::InvalidDataUrl(head)
        })?;
        let snapshot = Self {
            png: STANDARD.decode(encoded)?,
        };
        snapshot.decode()?;
        Ok(snapshot)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").field("png_bytes", &self.png.len()).finish()
    }
}
