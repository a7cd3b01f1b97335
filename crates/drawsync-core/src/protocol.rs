//! Wire protocol shared by the relay server and its clients.
//!
//! Every message is a JSON object tagged by `"type"`:
//! ```json
//! { "type": "join", "roomCode": "ABC123", "user": "Ada" }
//! { "type": "draw", "roomCode": "ABC123", "tool": "line", "startX": 10, "startY": 10, "endX": 50, "endY": 50, "color": "#ff0000", "lineWidth": 2 }
//! { "type": "cursor", "roomCode": "ABC123", "x": 120.5, "y": 48 }
//! { "type": "chat", "roomCode": "ABC123", "message": { "user": "Ada", "text": "hi", "timestamp": "09:41" } }
//! ```
//!
//! Decoding goes through [`ClientMessage::decode`] / [`ServerMessage::decode`],
//! which reject unknown tags, malformed payloads and out-of-range values with
//! a [`ProtocolError`].

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while decoding or validating a message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Invalid color `{0}`")]
    InvalidColor(String),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Largest absolute coordinate a draw operation may carry.
pub const MAX_COORDINATE: f64 = 1_000_000.0;

/// Largest width, height or radius: the span between two in-range coordinates.
pub const MAX_EXTENT: f64 = 2.0 * MAX_COORDINATE;

/// Widest stroke a draw operation may carry, in pixels.
pub const MAX_LINE_WIDTH: f64 = 10_000.0;

/// Opaque identity of one open channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Short opaque room code shared out-of-band between participants.
///
/// An empty code is representable so that a message with a missing
/// `roomCode` still decodes and is then dropped by routing, not parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Opaque RGB color, `#rgb` or `#rrggbb` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }
}

impl FromStr for HexColor {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..=i].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One freehand sample step: a segment between two consecutive samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeSegment {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub color: HexColor,
    pub line_width: f64,
}

impl StrokeSegment {
    pub fn new(from: Point, to: Point, color: HexColor, line_width: f64) -> Self {
        Self {
            x: [from.x, to.x],
            y: [from.y, to.y],
            color,
            line_width,
        }
    }

    pub fn from_point(&self) -> Point {
        Point::new(self.x[0], self.y[0])
    }

    pub fn to_point(&self) -> Point {
        Point::new(self.x[1], self.y[1])
    }
}

/// An axis-aligned rectangle outline. Width and height may be negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectangleOp {
    pub start_x: f64,
    pub start_y: f64,
    pub w: f64,
    pub h: f64,
    pub color: HexColor,
    pub line_width: f64,
}

impl RectangleOp {
    /// Rectangle spanned by a drag from `start` to `end`.
    pub fn from_drag(start: Point, end: Point, color: HexColor, line_width: f64) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            w: end.x - start.x,
            h: end.y - start.y,
            color,
            line_width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineOp {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub color: HexColor,
    pub line_width: f64,
}

impl LineOp {
    pub fn new(start: Point, end: Point, color: HexColor, line_width: f64) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
            color,
            line_width,
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Point {
        Point::new(self.end_x, self.end_y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EllipseOp {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
    pub color: HexColor,
    pub line_width: f64,
}

impl EllipseOp {
    /// Ellipse centered on `center` whose radii reach `edge`.
    pub fn from_drag(center: Point, edge: Point, color: HexColor, line_width: f64) -> Self {
        Self {
            cx: center.x,
            cy: center.y,
            rx: (edge.x - center.x).abs(),
            ry: (edge.y - center.y).abs(),
            color,
            line_width,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.cx, self.cy)
    }
}

/// Pen or eraser mode of a stroke segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeMode {
    Pen,
    Eraser,
}

/// The render routine a [`DrawOp`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKind {
    StrokeSegment,
    Rectangle,
    Line,
    Ellipse,
}

/// One immutable, self-contained render instruction, tagged by `"tool"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub enum DrawOp {
    Pen(StrokeSegment),
    Eraser(StrokeSegment),
    Rectangle(RectangleOp),
    Line(LineOp),
    #[serde(rename = "circle")]
    Ellipse(EllipseOp),
}

impl DrawOp {
    pub fn stroke(mode: StrokeMode, segment: StrokeSegment) -> Self {
        match mode {
            StrokeMode::Pen => DrawOp::Pen(segment),
            StrokeMode::Eraser => DrawOp::Eraser(segment),
        }
    }

    pub fn kind(&self) -> DrawKind {
        match self {
            DrawOp::Pen(_) | DrawOp::Eraser(_) => DrawKind::StrokeSegment,
            DrawOp::Rectangle(_) => DrawKind::Rectangle,
            DrawOp::Line(_) => DrawKind::Line,
            DrawOp::Ellipse(_) => DrawKind::Ellipse,
        }
    }

    /// Wire value of the `tool` tag.
    pub fn tool_name(&self) -> &'static str {
        match self {
            DrawOp::Pen(_) => "pen",
            DrawOp::Eraser(_) => "eraser",
            DrawOp::Rectangle(_) => "rectangle",
            DrawOp::Line(_) => "line",
            DrawOp::Ellipse(_) => "circle",
        }
    }

    pub fn color(&self) -> HexColor {
        match self {
            DrawOp::Pen(s) | DrawOp::Eraser(s) => s.color,
            DrawOp::Rectangle(r) => r.color,
            DrawOp::Line(l) => l.color,
            DrawOp::Ellipse(e) => e.color,
        }
    }

    pub fn line_width(&self) -> f64 {
        match self {
            DrawOp::Pen(s) | DrawOp::Eraser(s) => s.line_width,
            DrawOp::Rectangle(r) => r.line_width,
            DrawOp::Line(l) => l.line_width,
            DrawOp::Ellipse(e) => e.line_width,
        }
    }

    /// Reject geometry no renderer can draw.
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            DrawOp::Pen(s) | DrawOp::Eraser(s) => {
                finite("x", &s.x)?;
                finite("y", &s.y)?;
            }
            DrawOp::Rectangle(r) => {
                finite("startX", &[r.start_x, r.start_y])?;
                bounded("w", &[r.w, r.h], MAX_EXTENT)?;
            }
            DrawOp::Line(l) => {
                finite("startX", &[l.start_x, l.start_y])?;
                finite("endX", &[l.end_x, l.end_y])?;
            }
            DrawOp::Ellipse(e) => {
                finite("cx", &[e.cx, e.cy])?;
                bounded("rx", &[e.rx, e.ry], MAX_EXTENT)?;
                if e.rx < 0.0 || e.ry < 0.0 {
                    return Err(ProtocolError::InvalidField {
                        field: "rx",
                        reason: "radii must not be negative".to_string(),
                    });
                }
            }
        }
        let width = self.line_width();
        if !width.is_finite() || width <= 0.0 {
            return Err(ProtocolError::InvalidField {
                field: "lineWidth",
                reason: format!("expected a positive width, got {width}"),
            });
        }
        if width > MAX_LINE_WIDTH {
            return Err(ProtocolError::InvalidField {
                field: "lineWidth",
                reason: format!("width {width} exceeds {MAX_LINE_WIDTH}"),
            });
        }
        Ok(())
    }
}

fn finite(field: &'static str, values: &[f64]) -> ProtocolResult<()> {
    bounded(field, values, MAX_COORDINATE)
}

fn bounded(field: &'static str, values: &[f64], limit: f64) -> ProtocolResult<()> {
    if !values.iter().all(|v| v.is_finite()) {
        return Err(ProtocolError::InvalidField {
            field,
            reason: "coordinates must be finite".to_string(),
        });
    }
    if values.iter().any(|v| v.abs() > limit) {
        return Err(ProtocolError::InvalidField {
            field,
            reason: format!("values must lie within ±{limit}"),
        });
    }
    Ok(())
}

/// A chat line as displayed: author label, text and display timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    pub timestamp: String,
}

impl ChatMessage {
    /// Stamp a message with the local wall-clock time (`HH:MM`).
    pub fn now(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
        }
    }
}

/// Messages sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room (leaving any previous one).
    Join {
        #[serde(rename = "roomCode")]
        room_code: RoomCode,
        user: String,
    },
    /// A draw operation for the room.
    Draw {
        #[serde(rename = "roomCode", default)]
        room_code: RoomCode,
        #[serde(flatten)]
        op: DrawOp,
    },
    /// Local cursor position.
    Cursor {
        #[serde(rename = "roomCode", default)]
        room_code: RoomCode,
        x: f64,
        y: f64,
    },
    /// A chat line.
    Chat {
        #[serde(rename = "roomCode", default)]
        room_code: RoomCode,
        message: ChatMessage,
    },
}

impl ClientMessage {
    /// Parse and validate a client frame.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        let msg: ClientMessage = serde_json::from_str(text)?;
        msg.validate()?;
        Ok(msg)
    }

    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The room this message is addressed to.
    pub fn room_code(&self) -> &RoomCode {
        match self {
            ClientMessage::Join { room_code, .. }
            | ClientMessage::Draw { room_code, .. }
            | ClientMessage::Cursor { room_code, .. }
            | ClientMessage::Chat { room_code, .. } => room_code,
        }
    }

    fn validate(&self) -> ProtocolResult<()> {
        match self {
            ClientMessage::Draw { op, .. } => op.validate(),
            ClientMessage::Cursor { x, y, .. } => finite("x", &[*x, *y]),
            ClientMessage::Join { .. } | ClientMessage::Chat { .. } => Ok(()),
        }
    }
}

/// Messages delivered by the relay to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a join to the joiner.
    Joined {
        #[serde(rename = "roomCode")]
        room_code: RoomCode,
        id: ConnectionId,
        members: Vec<ConnectionId>,
    },
    /// Another participant joined the room.
    UserJoined { user: String, id: ConnectionId },
    /// A draw operation relayed verbatim.
    Draw {
        #[serde(rename = "roomCode", default)]
        room_code: RoomCode,
        #[serde(flatten)]
        op: DrawOp,
    },
    /// Another participant's cursor moved.
    Cursor { id: ConnectionId, x: f64, y: f64 },
    /// A chat line from another participant.
    Chat { message: ChatMessage },
    /// A participant's channel closed.
    PresenceLeave { id: ConnectionId },
}

impl ServerMessage {
    /// Parse and validate a server frame.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        let msg: ServerMessage = serde_json::from_str(text)?;
        match &msg {
            ServerMessage::Draw { op, .. } => op.validate()?,
            ServerMessage::Cursor { x, y, .. } => finite("x", &[*x, *y])?,
            _ => {}
        }
        Ok(msg)
    }

    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
