use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::StatusCode;

use crate::board::Board;
use crate::entities::JobDraft;
use crate::error::{invalid_input_error, Error};

pub async fn create(
    Extension(board): Extension<Arc<Board>>,
    Json(draft): Json<JobDraft>,
) -> Result<StatusCode, Error> {
    validate(&draft)?;

    board.submit_job(draft).await?;

    // the created row is not echoed back; the board updates through the
    // change feed
    Ok(StatusCode::ACCEPTED)
}

// the same gating the dispatch form applies before submitting
fn validate(draft: &JobDraft) -> Result<(), Error> {
    if draft.pickup.trim().is_empty()
        || draft.delivery.trim().is_empty()
        || draft.cargo.trim().is_empty()
    {
        return Err(invalid_input_error());
    }

    if !(draft.required_tons > 0.0) {
        return Err(invalid_input_error());
    }

    Ok(())
}
