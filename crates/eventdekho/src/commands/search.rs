//! One-shot search through the debounced search controller.

use tracing::warn;

use eventdekho_core::Backend;

use crate::cli::{GlobalOpts, SearchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: SearchArgs, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    let min = backend.config().min_query_length;
    if args.query.chars().count() < min {
        warn!(min, "query shorter than the minimum length, nothing to search");
    }

    let search = backend.search(&args.endpoint);
    let state = search.search_now(args.query).await;

    if let Some(message) = state.error {
        return Err(CliError::from_state_message(message));
    }
    output::emit(global.output, &state.results, global.quiet)
}
