use std::sync::Arc;

use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::Board;
use crate::error::{invalid_price_error, Error};

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    price: f64,
}

pub async fn create(
    Extension(board): Extension<Arc<Board>>,
    Path(id): Path<Uuid>,
    Json(params): Json<CreateParams>,
) -> Result<StatusCode, Error> {
    // positive prices only, gated here exactly like the bid control; the
    // stored constraint is the only server-side enforcement
    if !(params.price > 0.0) {
        return Err(invalid_price_error());
    }

    board.submit_bid(id, params.price).await?;

    Ok(StatusCode::ACCEPTED)
}
