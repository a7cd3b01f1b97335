//! Render dispatch from draw operations to the raster surface.

use crate::surface::Surface;
use drawsync_core::protocol::{DrawOp, EllipseOp, LineOp, RectangleOp, StrokeSegment};
use kurbo::{Ellipse, Rect};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// A draw operation payload that knows how to paint itself.
///
/// Every payload uses its own color and width, never the receiver's
/// current tool settings.
pub trait Renderable {
    fn render(&self, surface: &mut Surface);
}

impl Renderable for StrokeSegment {
    fn render(&self, surface: &mut Surface) {
        surface.stroke_line(self.from_point(), self.to_point(), self.color, self.line_width);
    }
}

impl Renderable for RectangleOp {
    fn render(&self, surface: &mut Surface) {
        let rect = Rect::new(
            self.start_x,
            self.start_y,
            self.start_x + self.w,
            self.start_y + self.h,
        );
        surface.stroke_shape(&rect, self.color, self.line_width);
    }
}

impl Renderable for LineOp {
    fn render(&self, surface: &mut Surface) {
        surface.stroke_line(self.start(), self.end(), self.color, self.line_width);
    }
}

impl Renderable for EllipseOp {
    fn render(&self, surface: &mut Surface) {
        let ellipse = Ellipse::new(self.center(), (self.rx, self.ry), 0.0);
        surface.stroke_shape(&ellipse, self.color, self.line_width);
    }
}

/// Apply one operation to the surface. Adding a tool means adding a
/// variant and its [`Renderable`] impl; this match stays exhaustive.
pub fn render(surface: &mut Surface, op: &DrawOp) {
    match op {
        DrawOp::Pen(segment) | DrawOp::Eraser(segment) => segment.render(surface),
        DrawOp::Rectangle(rect) => rect.render(surface),
        DrawOp::Line(line) => line.render(surface),
        DrawOp::Ellipse(ellipse) => ellipse.render(surface),
    }
}
