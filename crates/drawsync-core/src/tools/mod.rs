//! Drawing tools: turn pointer gestures into draw operations.
//!
//! Freehand tools (pen, eraser) produce one stroke segment per sampled
//! movement while the pointer is down. Shape tools produce a single
//! operation when the gesture completes, carrying the final geometry.

use crate::protocol::{DrawOp, EllipseOp, HexColor, LineOp, RectangleOp, StrokeMode, StrokeSegment};
use kurbo::Point;

/// Canvas background. The eraser paints with it.
pub const DEFAULT_BACKGROUND: HexColor = HexColor::rgb(0x1a, 0x1a, 0x2e);

/// Default stroke color for new sessions.
pub const DEFAULT_COLOR: HexColor = HexColor::rgb(0x64, 0x64, 0xff);

/// Default stroke width in pixels.
pub const DEFAULT_LINE_WIDTH: f64 = 3.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
    Line,
    Rectangle,
    Ellipse,
}

impl ToolKind {
    /// Whether the tool emits while the pointer moves rather than on release.
    pub fn is_freehand(self) -> bool {
        matches!(self, ToolKind::Pen | ToolKind::Eraser)
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pen" => Ok(ToolKind::Pen),
            "eraser" => Ok(ToolKind::Eraser),
            "line" => Ok(ToolKind::Line),
            "rectangle" | "rect" => Ok(ToolKind::Rectangle),
            "ellipse" | "circle" => Ok(ToolKind::Ellipse),
            other => Err(format!("unknown tool `{other}`")),
        }
    }
}

/// Color and width applied to new operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: HexColor,
    pub line_width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
enum ToolState {
    #[default]
    Idle,
    Active {
        /// Where the gesture started.
        start: Point,
        /// Most recent sample.
        last: Point,
        /// Operations emitted so far by this gesture.
        emitted: usize,
    },
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Final operation for shape tools.
    pub op: Option<DrawOp>,
    /// Whether the gesture drew anything and should be committed to history.
    pub completed: bool,
}

impl ToolOutcome {
    fn nothing() -> Self {
        Self { op: None, completed: false }
    }
}

/// Manages the current tool and its gesture state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Style for new operations.
    pub style: StrokeStyle,
    /// Color the eraser paints with.
    pub eraser_color: HexColor,
    state: ToolState,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            style: StrokeStyle::default(),
            eraser_color: DEFAULT_BACKGROUND,
            state: ToolState::Idle,
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool. Abandons any gesture in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Pointer pressed.
    pub fn begin(&mut self, point: Point) {
        self.state = ToolState::Active {
            start: point,
            last: point,
            emitted: 0,
        };
    }

    /// Pointer moved. Returns a stroke segment for freehand tools.
    pub fn update(&mut self, point: Point) -> Option<DrawOp> {
        let tool = self.current_tool;
        let style = self.effective_style();
        let ToolState::Active { last, emitted, .. } = &mut self.state else {
            return None;
        };

        if !tool.is_freehand() {
            *last = point;
            return None;
        }

        let segment = StrokeSegment::new(*last, point, style.color, style.line_width);
        *last = point;
        *emitted += 1;
        let mode = if tool == ToolKind::Eraser { StrokeMode::Eraser } else { StrokeMode::Pen };
        Some(DrawOp::stroke(mode, segment))
    }

    /// Pointer released. Shape tools produce their final operation here.
    pub fn end(&mut self, point: Point) -> ToolOutcome {
        let ToolState::Active { start, emitted, .. } = std::mem::take(&mut self.state) else {
            return ToolOutcome::nothing();
        };

        if self.current_tool.is_freehand() {
            return ToolOutcome { op: None, completed: emitted > 0 };
        }

        let op = self.shape_op(start, point);
        ToolOutcome { completed: op.is_some(), op }
    }

    /// Abandon the current gesture without emitting anything.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// The shape the current gesture would commit if released now.
    pub fn preview_op(&self) -> Option<DrawOp> {
        match &self.state {
            ToolState::Active { start, last, .. } if !self.current_tool.is_freehand() => {
                self.shape_op(*start, *last)
            }
            _ => None,
        }
    }

    fn effective_style(&self) -> StrokeStyle {
        match self.current_tool {
            ToolKind::Eraser => StrokeStyle {
                color: self.eraser_color,
                line_width: self.style.line_width,
            },
            _ => self.style,
        }
    }

    fn shape_op(&self, start: Point, end: Point) -> Option<DrawOp> {
        let StrokeStyle { color, line_width } = self.style;
        match self.current_tool {
            ToolKind::Line => Some(DrawOp::Line(LineOp::new(start, end, color, line_width))),
            ToolKind::Rectangle => Some(DrawOp::Rectangle(RectangleOp::from_drag(
                start, end, color, line_width,
            ))),
            ToolKind::Ellipse => Some(DrawOp::Ellipse(EllipseOp::from_drag(
                start, end, color, line_width,
            ))),
            ToolKind::Pen | ToolKind::Eraser => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_emits_segment_per_move() {
        let mut tools = ToolManager::new();
        tools.begin(Point::new(0.0, 0.0));

        let first = tools.update(Point::new(5.0, 0.0)).unwrap();
        let second = tools.update(Point::new(5.0, 5.0)).unwrap();

        let DrawOp::Pen(first) = first else { panic!("expected pen segment") };
        let DrawOp::Pen(second) = second else { panic!("expected pen segment") };
        assert_eq!(first.from_point(), Point::new(0.0, 0.0));
        assert_eq!(first.to_point(), Point::new(5.0, 0.0));
        assert_eq!(second.from_point(), Point::new(5.0, 0.0));
        assert_eq!(first.color, DEFAULT_COLOR);

        let outcome = tools.end(Point::new(5.0, 5.0));
        assert!(outcome.op.is_none());
        assert!(outcome.completed);
        assert!(!tools.is_active());
    }

    #[test]
    fn test_click_without_movement_commits_nothing() {
        let mut tools = ToolManager::new();
        tools.begin(Point::new(3.0, 3.0));
        assert!(!tools.end(Point::new(3.0, 3.0)).completed);
    }

    #[test]
    fn test_eraser_paints_background() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Eraser);
        tools.style.line_width = 10.0;
        tools.begin(Point::ZERO);

        match tools.update(Point::new(1.0, 1.0)) {
            Some(DrawOp::Eraser(segment)) => {
                assert_eq!(segment.color, DEFAULT_BACKGROUND);
                assert!((segment.line_width - 10.0).abs() < f64::EPSILON);
            }
            other => panic!("expected eraser segment, got {other:?}"),
        }
    }

    #[test]
    fn test_shapes_emit_once_on_release() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Rectangle);
        tools.begin(Point::new(10.0, 10.0));
        assert!(tools.update(Point::new(20.0, 20.0)).is_none());
        assert!(tools.update(Point::new(30.0, 40.0)).is_none());

        let outcome = tools.end(Point::new(30.0, 40.0));
        assert!(outcome.completed);
        match outcome.op {
            Some(DrawOp::Rectangle(rect)) => {
                assert!((rect.start_x - 10.0).abs() < f64::EPSILON);
                assert!((rect.w - 20.0).abs() < f64::EPSILON);
                assert!((rect.h - 30.0).abs() < f64::EPSILON);
            }
            other => panic!("expected rectangle, got {other:?}"),
        }
    }

    #[test]
    fn test_ellipse_radii_from_drag() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Ellipse);
        tools.begin(Point::new(50.0, 50.0));
        let outcome = tools.end(Point::new(20.0, 70.0));
        let Some(DrawOp::Ellipse(ellipse)) = outcome.op else { panic!("expected ellipse") };
        assert_eq!(ellipse.center(), Point::new(50.0, 50.0));
        assert!((ellipse.rx - 30.0).abs() < f64::EPSILON);
        assert!((ellipse.ry - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_preview_tracks_last_sample() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Line);
        assert!(tools.preview_op().is_none());
        tools.begin(Point::new(0.0, 0.0));
        tools.update(Point::new(8.0, 6.0));
        let Some(DrawOp::Line(line)) = tools.preview_op() else { panic!("expected line preview") };
        assert_eq!(line.end(), Point::new(8.0, 6.0));
    }

    #[test]
    fn test_update_without_begin_is_ignored() {
        let mut tools = ToolManager::new();
        assert!(tools.update(Point::new(1.0, 1.0)).is_none());
        assert_eq!(tools.end(Point::new(1.0, 1.0)), ToolOutcome::nothing());
    }

    #[test]
    fn test_tool_from_str() {
        assert_eq!("circle".parse::<ToolKind>().unwrap(), ToolKind::Ellipse);
        assert_eq!("RECT".parse::<ToolKind>().unwrap(), ToolKind::Rectangle);
        assert!("spray".parse::<ToolKind>().is_err());
    }
}
