//! Result form submission endpoint

use serde_json::Value;

use super::crud::to_data;
use crate::persistence::PerformanceContext;
use crate::results::{submit_results, ResultSubmission};
use crate::service::envelope::DispatchError;
use crate::service::parsers::parse_payload;
use crate::settings::Settings;

/// Score and store a result form using the session's point tables.
pub async fn submit(
    ctx: &PerformanceContext,
    settings: &Settings,
    payload: Value,
) -> Result<Value, DispatchError> {
    let submission: ResultSubmission = parse_payload(payload)?;
    tracing::info!(
        event_id = %submission.event_id,
        entries = submission.entries.len(),
        "Request ps:event:submitResults"
    );
    let outcome = submit_results(ctx, &settings.points, submission).await?;
    to_data(&outcome)
}
