use std::io::Read;

use tracing::info;

use crate::auth::CredentialStore;
use crate::cfg::SettingsStore;
use crate::csv_source::read_rows;
use crate::error::AppResult;
use crate::oauth::TokenEndpoint;
use crate::resolve::{Overrides, ResolvedParams};
use crate::sheets::{write_spreadsheet, SpreadsheetBackend};

/// Per-invocation options of the default command.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Empty means a timestamped title is generated.
    pub title: String,
    pub overrides: Overrides,
}

/// Everything one run needs from outside the process.
pub struct JobContext<'a, E> {
    pub settings: &'a SettingsStore,
    pub credentials: &'a CredentialStore,
    pub token_endpoint: &'a E,
}

/// Writes `input` to a new spreadsheet and returns its URL.
///
/// Settings are resolved and the input is read in full before any network
/// traffic; `connect` receives the access token and builds the backend.
/// A backend that cannot be built aborts the run before any remote call.
pub async fn run_job<E, B, R, F>(
    ctx: &JobContext<'_, E>,
    options: &JobOptions,
    input: R,
    connect: F,
) -> AppResult<String>
where
    E: TokenEndpoint,
    B: SpreadsheetBackend,
    R: Read,
    F: FnOnce(String) -> AppResult<B>,
{
    info!("Starting job execution");

    let settings = ctx.settings.load()?;
    let params = ResolvedParams::resolve(&options.overrides, &settings)?;

    let rows = read_rows(input)?;

    let (_, token) = ctx.credentials.get_valid_client(ctx.token_endpoint).await?;
    let backend = connect(token.access_token)?;

    let url = write_spreadsheet(&backend, &options.title, &rows, &params).await?;
    info!("Job completed successfully: {}", url);
    Ok(url)
}
