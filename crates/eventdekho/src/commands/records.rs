//! List, get, create, update and delete against any endpoint.

use serde_json::{Value, json};

use eventdekho_core::{Backend, FetchOptions, Params};

use crate::cli::{CreateArgs, GlobalOpts, ListArgs, RecordArgs, UpdateArgs};
use crate::error::CliError;
use crate::output;

pub async fn list(args: ListArgs, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    let params: Params = args.params.into_iter().collect();

    // Without paging flags this is a plain collection read.
    if args.page.is_none() && args.limit.is_none() {
        let data = backend.crud(&args.endpoint).list(&params).await?;
        return output::emit(global.output, &data, global.quiet);
    }

    let mut options = FetchOptions::new();
    options.params = params;
    let limit = args.limit.unwrap_or(backend.config().page_size);
    if limit == 0 {
        return Err(CliError::Validation {
            field: "limit".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let pages = backend.paginated_with_limit(&args.endpoint, options, limit);
    let page = args.page.unwrap_or(1).max(1);
    if pages.current_page() == page {
        pages.load().await;
    } else {
        pages.go_to_page(page).await;
    }

    let state = pages.state();
    match (state.data, state.error) {
        (_, Some(message)) => Err(CliError::from_state_message(message)),
        (data, None) => {
            let body = json!({
                "data": data.unwrap_or(Value::Null),
                "pagination": pages.page_info(),
            });
            output::emit(global.output, &body, global.quiet)
        }
    }
}

pub async fn get(args: RecordArgs, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    let data = backend.crud(&args.endpoint).read(&args.id).await?;
    output::emit(global.output, &data, global.quiet)
}

pub async fn create(args: CreateArgs, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    let body = parse_body(&args.data)?;
    let data = backend.crud(&args.endpoint).create(&body).await?;
    output::emit(global.output, &data, global.quiet)
}

pub async fn update(args: UpdateArgs, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    let body = parse_body(&args.data)?;
    let data = backend.crud(&args.endpoint).update(&args.id, &body).await?;
    output::emit(global.output, &data, global.quiet)
}

pub async fn delete(args: RecordArgs, backend: &Backend, global: &GlobalOpts) -> Result<(), CliError> {
    let data = backend.crud(&args.endpoint).remove(&args.id).await?;
    output::emit(global.output, &data, global.quiet)
}

fn parse_body(raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: "data".into(),
        reason: format!("not valid JSON: {e}"),
    })
}
