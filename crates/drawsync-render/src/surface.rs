//! CPU raster surface.
//!
//! Every stroke is rasterized the same way: the geometry is flattened to
//! line segments and each pixel whose center lies within half the line
//! width of a segment takes the stroke color. That gives round caps and
//! joins like a 2D canvas with `lineCap = "round"`, without antialiasing,
//! so identical operation sequences yield identical pixels.

use drawsync_core::protocol::HexColor;
use image::{Rgba, RgbaImage, imageops};
use kurbo::{Line, ParamCurveNearest, PathEl, Point, Rect, Shape};

/// Tolerance used when flattening curves to segments, in pixels.
const FLATTEN_TOLERANCE: f64 = 0.25;

/// Thinnest stroke radius that still covers a pixel center.
const MIN_RADIUS: f64 = 0.5;

fn rgba(color: HexColor) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 255])
}

/// The shared drawing surface of one client.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
    background: HexColor,
}

impl Surface {
    /// Create a surface filled with `background`.
    pub fn new(width: u32, height: u32, background: HexColor) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, rgba(background)),
            background,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn background(&self) -> HexColor {
        self.background
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Color at a pixel, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<HexColor> {
        self.pixels
            .get_pixel_checked(x, y)
            .map(|p| HexColor::rgb(p[0], p[1], p[2]))
    }

    /// Fill the whole surface with the background color.
    pub fn clear(&mut self) {
        let bg = rgba(self.background);
        for pixel in self.pixels.pixels_mut() {
            *pixel = bg;
        }
    }

    /// Change the size, keeping existing content anchored at the top-left.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width() && height == self.height() {
            return;
        }
        let mut resized = RgbaImage::from_pixel(width, height, rgba(self.background));
        imageops::replace(&mut resized, &self.pixels, 0, 0);
        self.pixels = resized;
    }

    /// Replace the content with `image`, drawn at the origin over the background.
    pub fn load_image(&mut self, image: &RgbaImage) {
        self.clear();
        imageops::replace(&mut self.pixels, image, 0, 0);
    }

    /// Stroke the outline of any kurbo shape.
    pub fn stroke_shape(&mut self, shape: &impl Shape, color: HexColor, line_width: f64) {
        let radius = (line_width / 2.0).max(MIN_RADIUS);
        // Shapes that cannot touch a pixel are never flattened.
        let reach = shape.bounding_box().inflate(radius, radius);
        if reach.intersect(self.bounds()).is_zero_area() {
            return;
        }

        let mut segments = Vec::new();
        let mut current: Option<Point> = None;
        let mut subpath_start: Option<Point> = None;

        kurbo::flatten(shape.path_elements(FLATTEN_TOLERANCE), FLATTEN_TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => {
                current = Some(p);
                subpath_start = Some(p);
            }
            PathEl::LineTo(p) => {
                if let Some(from) = current {
                    segments.push(Line::new(from, p));
                }
                current = Some(p);
            }
            PathEl::ClosePath => {
                if let (Some(from), Some(start)) = (current, subpath_start) {
                    segments.push(Line::new(from, start));
                }
                current = subpath_start;
            }
            // flatten only emits the variants above
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        });

        let color = rgba(color);
        for segment in segments {
            self.stamp_segment(segment, radius, color);
        }
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }

    /// Stroke a straight segment between two points.
    pub fn stroke_line(&mut self, from: Point, to: Point, color: HexColor, line_width: f64) {
        self.stroke_shape(&Line::new(from, to), color, line_width);
    }

    fn stamp_segment(&mut self, segment: Line, radius: f64, color: Rgba<u8>) {
        let bounds = segment.bounding_box().inflate(radius, radius);
        let x0 = bounds.x0.floor().max(0.0) as u32;
        let y0 = bounds.y0.floor().max(0.0) as u32;
        let x1 = bounds.x1.ceil().min(self.width() as f64).max(0.0) as u32;
        let y1 = bounds.y1.ceil().min(self.height() as f64).max(0.0) as u32;

        let radius_sq = radius * radius;
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if segment.nearest(center, 1e-9).distance_sq <= radius_sq {
                    self.pixels.put_pixel(x, y, color);
                }
            }
        }
    }
}
