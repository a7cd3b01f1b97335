//! Line-oriented commands for the headless client.
//!
//! ```text
//! line 10 10 50 50        stroked line
//! rect 10 10 50 40        rectangle dragged between two corners
//! circle 50 50 80 70      ellipse centered on the first point
//! stroke 0 0 10 5 20 0    freehand stroke through the points
//! tool eraser | color #ff0000 | width 4
//! chat hello there
//! undo | redo | clear | save [path] | quit
//! ```

use crate::session::{Session, SessionResult};
use drawsync_core::protocol::{HexColor, MAX_COORDINATE, MAX_LINE_WIDTH, ProtocolError};
use drawsync_core::storage::SnapshotStore;
use drawsync_core::tools::ToolKind;
use kurbo::Point;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },
    #[error("Invalid number `{0}`")]
    InvalidNumber(String),
    #[error("{0}")]
    InvalidTool(String),
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

impl From<ProtocolError> for CommandError {
    fn from(e: ProtocolError) -> Self {
        CommandError::InvalidColor(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Line(Point, Point),
    Rect(Point, Point),
    Circle { center: Point, edge: Point },
    Stroke(Vec<Point>),
    Tool(ToolKind),
    Color(HexColor),
    Width(f64),
    Chat(String),
    Undo,
    Redo,
    Clear,
    Save(Option<PathBuf>),
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match name.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "line" => {
                let [from, to] = two_points("line", &args)?;
                Ok(Command::Line(from, to))
            }
            "rect" | "rectangle" => {
                let [from, to] = two_points("rect", &args)?;
                Ok(Command::Rect(from, to))
            }
            "circle" | "ellipse" => {
                let [center, edge] = two_points("circle", &args)?;
                Ok(Command::Circle { center, edge })
            }
            "stroke" => {
                let numbers = numbers(&args)?;
                if numbers.len() < 4 || numbers.len() % 2 != 0 {
                    return Err(CommandError::Usage {
                        command: "stroke",
                        expected: "at least two x y pairs",
                    });
                }
                Ok(Command::Stroke(
                    numbers.chunks(2).map(|xy| Point::new(xy[0], xy[1])).collect(),
                ))
            }
            "tool" => match args.as_slice() {
                [tool] => tool.parse().map(Command::Tool).map_err(CommandError::InvalidTool),
                _ => Err(CommandError::Usage {
                    command: "tool",
                    expected: "one tool name",
                }),
            },
            "color" => match args.as_slice() {
                [color] => Ok(Command::Color(color.parse()?)),
                _ => Err(CommandError::Usage {
                    command: "color",
                    expected: "one hex color",
                }),
            },
            "width" => match numbers(&args)?.as_slice() {
                [width] if *width > 0.0 && *width <= MAX_LINE_WIDTH => Ok(Command::Width(*width)),
                _ => Err(CommandError::Usage {
                    command: "width",
                    expected: "one positive number",
                }),
            },
            "chat" | "say" => Ok(Command::Chat(rest.to_string())),
            "undo" => Ok(Command::Undo),
            "redo" => Ok(Command::Redo),
            "clear" => Ok(Command::Clear),
            "save" => Ok(Command::Save((!rest.is_empty()).then(|| PathBuf::from(rest)))),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Whether the client keeps reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl Command {
    /// Run the command against `session`. `save` without a path writes to
    /// `default_output`.
    pub fn execute<S: SnapshotStore>(
        self,
        session: &mut Session<S>,
        default_output: &Path,
    ) -> SessionResult<Flow> {
        match self {
            Command::Line(from, to) => session.gesture(ToolKind::Line, &[from, to])?,
            Command::Rect(from, to) => session.gesture(ToolKind::Rectangle, &[from, to])?,
            Command::Circle { center, edge } => session.gesture(ToolKind::Ellipse, &[center, edge])?,
            Command::Stroke(points) => {
                let tool = match session.tools().current_tool {
                    ToolKind::Eraser => ToolKind::Eraser,
                    _ => ToolKind::Pen,
                };
                session.gesture(tool, &points)?;
            }
            Command::Tool(tool) => session.tools_mut().set_tool(tool),
            Command::Color(color) => session.tools_mut().style.color = color,
            Command::Width(width) => session.tools_mut().style.line_width = width,
            Command::Chat(text) => session.send_chat(&text)?,
            Command::Undo => {
                if !session.undo()? {
                    log::info!("Nothing to undo");
                }
            }
            Command::Redo => {
                if !session.redo()? {
                    log::info!("Nothing to redo");
                }
            }
            Command::Clear => session.clear()?,
            Command::Save(path) => {
                session.export_png(path.as_deref().unwrap_or(default_output))?;
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

fn numbers(args: &[&str]) -> Result<Vec<f64>, CommandError> {
    args.iter()
        .map(|arg| match arg.parse::<f64>() {
            Ok(n) if n.is_finite() && n.abs() <= MAX_COORDINATE => Ok(n),
            _ => Err(CommandError::InvalidNumber(arg.to_string())),
        })
        .collect()
}

fn two_points(command: &'static str, args: &[&str]) -> Result<[Point; 2], CommandError> {
    match numbers(args)?.as_slice() {
        [x0, y0, x1, y1] => Ok([Point::new(*x0, *y0), Point::new(*x1, *y1)]),
        _ => Err(CommandError::Usage {
            command,
            expected: "four numbers",
        }),
    }
}
