//! Follow an endpoint's event stream until Ctrl-C or `--count` messages.

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use eventdekho_core::{Backend, StreamState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    if args.count == Some(0) {
        return Ok(());
    }

    let stream = backend.stream(&args.endpoint);
    let mut messages = stream.subscribe_messages();
    let mut states = stream.subscribe();

    // Pretty JSON would split one message across lines.
    let format = match global.output {
        OutputFormat::Json => OutputFormat::JsonCompact,
        other => other,
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0usize;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = states.borrow_and_update().clone();
                match snapshot.state {
                    StreamState::Connected => info!("stream connected"),
                    StreamState::DisconnectedRetrying => {
                        warn!(error = ?snapshot.error, reconnects = snapshot.reconnects, "stream lost, retrying");
                    }
                    StreamState::Closed => break,
                    StreamState::Connecting => {}
                }
            }
            message = messages.recv() => match message {
                Ok(payload) => {
                    output::emit(format, payload.as_ref(), global.quiet)?;
                    seen += 1;
                    if args.count.is_some_and(|n| seen >= n) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "output fell behind, messages skipped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    stream.shutdown();
    Ok(())
}
