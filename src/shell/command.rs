//! Commands typed into the shell
//!
//! Lines starting with `/` are commands; anything else is a chat message for
//! the open collection.

use thiserror::Error;

use crate::gateway::{AssistantModel, CollectionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ========== Collections ==========
    /// Print the (filtered) collection list
    List,
    /// Set the search filter, or clear it with None
    Search(Option<String>),
    /// Create a collection (blank = default name)
    New(Option<String>),
    Rename { id: CollectionId, name: String },
    Delete(CollectionId),
    /// Reload the list from the server
    Refresh,

    // ========== Session ==========
    Open(CollectionId),
    /// Close the open collection
    Back,
    /// Select a model, or go back to the server default with None
    Model(Option<AssistantModel>),
    Send(String),

    // ========== Global ==========
    Logout,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '/{0}'. Type /help for the list of commands.")]
    Unknown(String),
    #[error("Usage: /{0}")]
    Usage(&'static str),
    #[error("Unknown model '{0}'. Available: tinyllama, mistral, wizardlm")]
    UnknownModel(String),
}

pub const HELP: &str = "\
Commands:
  /list                 show collections
  /search [term]        filter collections (no term clears the filter)
  /new [name]           create a collection
  /rename <id> <name>   rename a collection
  /delete <id>          delete a collection
  /refresh              reload collections from the server
  /open <id>            open a collection
  /back                 close the open collection
  /model [name]         choose tinyllama, mistral or wizardlm (no name = default)
  /logout               sign out
  /quit                 exit
Anything else is sent as a message to the open collection.";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let arg = (!args.is_empty()).then(|| args.to_string());

    let command = match name.to_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "search" | "find" => Command::Search(arg),
        "new" | "create" => Command::New(arg),
        "rename" => {
            let (id, new_name) = args
                .split_once(char::is_whitespace)
                .map(|(id, name)| (id, name.trim()))
                .filter(|(_, name)| !name.is_empty())
                .ok_or(CommandError::Usage("rename <id> <name>"))?;
            Command::Rename {
                id: CollectionId::from(id),
                name: new_name.to_string(),
            }
        }
        "delete" | "rm" => Command::Delete(CollectionId::from(
            arg.ok_or(CommandError::Usage("delete <id>"))?,
        )),
        "refresh" => Command::Refresh,
        "open" => Command::Open(CollectionId::from(
            arg.ok_or(CommandError::Usage("open <id>"))?,
        )),
        "back" | "close" => Command::Back,
        "model" => match arg {
            None => Command::Model(None),
            Some(name) => Command::Model(Some(
                AssistantModel::parse(&name).ok_or(CommandError::UnknownModel(name))?,
            )),
        },
        "logout" => Command::Logout,
        "quit" | "exit" | "q" => Command::Quit,
        "help" | "h" | "?" => Command::Help,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}
