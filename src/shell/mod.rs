//! Interactive line-oriented front end
//!
//! Reads commands from stdin and runs each one as its own task, so a slow
//! history fetch or chat reply never blocks the next command. A renderer task
//! listens on the change bus and prints transcript updates as they land.

pub mod command;
pub mod render;

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::session::{SendOutcome, SessionError, SessionManager, StateChange, ViewProjection};

pub use command::{parse_command, Command, CommandError, HELP};
pub use render::{render_collections, render_message, render_model, TranscriptCursor};

/// Why the shell stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    Quit,
    LoggedOut,
    /// The server no longer accepts the session token
    LoginRequired,
}

pub struct Shell {
    manager: Arc<SessionManager>,
    projection: Arc<Mutex<ViewProjection>>,
}

impl Shell {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            projection: Arc::new(Mutex::new(ViewProjection::new())),
        }
    }

    pub async fn run(self) -> Result<ShellExit> {
        let renderer = tokio::spawn(render_loop(
            self.manager.clone(),
            self.manager.bus().subscribe(),
        ));
        let (login_tx, mut login_rx) = mpsc::channel::<()>(1);

        println!("{}", self.list());
        println!("Type /help for commands.");

        let mut lines = spawn_stdin_reader();
        let exit = loop {
            let line = tokio::select! {
                line = lines.recv() => line,
                _ = login_rx.recv() => break ShellExit::LoginRequired,
            };
            let Some(line) = line else {
                break ShellExit::Quit;
            };

            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };

            match command {
                Command::Quit => break ShellExit::Quit,
                Command::Help => println!("{}", HELP),
                Command::List => println!("{}", self.list()),
                Command::Search(term) => {
                    match term {
                        Some(term) => self.projection.lock().set_search_term(term),
                        None => self.projection.lock().clear_search(),
                    }
                    println!("{}", self.list());
                }
                Command::Model(model) => {
                    self.manager.controller().set_model(model);
                    println!("{}", render_model(model));
                }
                Command::Logout => {
                    if let Err(e) = self.manager.logout().await {
                        tracing::warn!(error = %e, "Logout failed");
                    }
                    println!("Signed out.");
                    break ShellExit::LoggedOut;
                }
                command => {
                    let manager = self.manager.clone();
                    let projection = self.projection.clone();
                    let login_tx = login_tx.clone();
                    tokio::spawn(async move {
                        match execute(&manager, &projection, command).await {
                            Ok(()) => {}
                            Err(SessionError::LoginRequired) => {
                                println!("Your session has expired. Please log in again.");
                                let _ = login_tx.try_send(());
                            }
                            Err(e) => println!("{}", e),
                        }
                    });
                }
            }
        };

        renderer.abort();
        Ok(exit)
    }

    fn list(&self) -> String {
        render_collections(&self.manager.view(&self.projection.lock()))
    }
}

/// Read stdin on a dedicated thread so exiting never waits on a pending read.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run one collection or session command to completion.
async fn execute(
    manager: &SessionManager,
    projection: &Mutex<ViewProjection>,
    command: Command,
) -> Result<(), SessionError> {
    let list = || render_collections(&manager.view(&projection.lock()));

    match command {
        Command::New(name) => {
            manager
                .registry()
                .create(name.as_deref().unwrap_or_default())
                .await?;
            println!("{}", list());
        }
        Command::Rename { id, name } => {
            manager.registry().rename(&id, &name).await?;
            println!("Renamed {} to \"{}\".", id, name);
        }
        Command::Delete(id) => {
            manager.delete_collection(&id).await?;
            println!("Deleted {}.", id);
        }
        Command::Refresh => {
            manager.registry().refresh().await?;
            println!("{}", list());
        }
        Command::Open(id) => {
            if !manager.registry().contains(&id) {
                println!("No collection with id {}. Try /list.", id);
                return Ok(());
            }
            manager.controller().open(Some(id)).await?;
        }
        Command::Back => {
            manager.controller().open(None).await?;
        }
        Command::Send(text) => {
            if manager.view(&projection.lock()).input_disabled {
                if manager.controller().collection_id().is_none() {
                    println!("Open a collection first (/open <id>).");
                } else {
                    println!("Still waiting for the previous reply...");
                }
                return Ok(());
            }
            match manager.controller().send(&text).await {
                Ok(SendOutcome::Ignored) => println!("Still waiting for the previous reply..."),
                Ok(_) => {}
                // Other failures are already in the transcript.
                Err(crate::gateway::GatewayError::Unauthenticated) => {
                    return Err(SessionError::LoginRequired)
                }
                Err(e) if e.is_not_found() => {
                    println!("This collection no longer exists.");
                }
                Err(_) => {}
            }
        }
        Command::List
        | Command::Search(_)
        | Command::Model(_)
        | Command::Logout
        | Command::Quit
        | Command::Help => {}
    }
    Ok(())
}

/// Print transcript changes as the session moves.
async fn render_loop(manager: Arc<SessionManager>, mut changes: broadcast::Receiver<StateChange>) {
    let mut cursor = TranscriptCursor::new();
    loop {
        match changes.recv().await {
            Ok(StateChange::SessionChanged) | Ok(StateChange::SignedOut) => {}
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Renderer lagged behind state changes");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }

        let session = manager.controller().snapshot();
        let title = session
            .collection_id
            .as_ref()
            .and_then(|id| manager.registry().get(id))
            .map(|c| c.name);
        for line in cursor.advance(&session, title.as_deref()) {
            println!("{}", line);
        }
    }
}
