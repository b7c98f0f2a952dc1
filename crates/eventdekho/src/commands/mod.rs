//! Command dispatch.

pub mod config_cmd;
pub mod records;
pub mod search;
pub mod watch;

use eventdekho_core::Backend;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a backend-bound command to its handler.
pub async fn dispatch(cmd: Command, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => records::list(args, backend, global).await,
        Command::Get(args) => records::get(args, backend, global).await,
        Command::Create(args) => records::create(args, backend, global).await,
        Command::Update(args) => records::update(args, backend, global).await,
        Command::Delete(args) => records::delete(args, backend, global).await,
        Command::Search(args) => search::handle(args, backend, global).await,
        Command::Watch(args) => watch::handle(args, backend, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not use the backend".into(),
        )),
    }
}
