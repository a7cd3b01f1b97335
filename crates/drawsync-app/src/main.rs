//! Headless DrawSync client entry point.

use clap::Parser;
use drawsync_app::{ClientArgs, Command, CommandError, Flow, Session};
use drawsync_core::protocol::RoomCode;
use drawsync_core::storage::SnapshotStore;
use drawsync_core::sync::NativeWebSocket;
use drawsync_core::tools::DEFAULT_BACKGROUND;
use drawsync_render::Surface;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// Roughly one frame.
const TICK: Duration = Duration::from_millis(16);

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ClientArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(args.storage()?);
    log::info!("Persisting canvas under {}", store.base_path().display());

    let surface = Surface::new(args.width, args.height, DEFAULT_BACKGROUND);
    let mut session = Session::open(args.name.clone(), surface, store)?;

    let mut ws = NativeWebSocket::new();
    match &args.room {
        Some(room) => {
            ws.connect(&args.url)?;
            session.join(RoomCode::new(room.as_str()))?;
        }
        None => log::info!("No room given, drawing offline"),
    }

    let lines = spawn_stdin_reader();
    loop {
        for event in ws.poll_events() {
            session.handle_event(event);
        }

        loop {
            match lines.try_recv() {
                Ok(line) => {
                    if execute_line(&mut session, &line, &args) == Flow::Quit {
                        return shutdown(&mut session, &mut ws);
                    }
                }
                Err(TryRecvError::Empty) => break,
                // stdin closed
                Err(TryRecvError::Disconnected) => return shutdown(&mut session, &mut ws),
            }
        }

        flush(&mut session, &ws);
        thread::sleep(TICK);
    }
}

fn execute_line<S: SnapshotStore>(session: &mut Session<S>, line: &str, args: &ClientArgs) -> Flow {
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(CommandError::Empty) => return Flow::Continue,
        Err(e) => {
            log::warn!("{}", e);
            return Flow::Continue;
        }
    };
    match command.execute(session, &args.output) {
        Ok(flow) => flow,
        Err(e) => {
            log::error!("{}", e);
            Flow::Continue
        }
    }
}

fn flush<S: SnapshotStore>(session: &mut Session<S>, ws: &NativeWebSocket) {
    for msg in session.take_outgoing() {
        if let Err(e) = ws.send(&msg) {
            log::debug!("Message not sent: {}", e);
        }
    }
}

fn shutdown<S: SnapshotStore>(
    session: &mut Session<S>,
    ws: &mut NativeWebSocket,
) -> Result<(), Box<dyn std::error::Error>> {
    flush(session, ws);
    ws.disconnect();
    log::info!("Bye");
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
