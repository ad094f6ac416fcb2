use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    auth::extractor::AuthUser,
    error::{ApiError, ApiResult},
    form::FormData,
    payments::gateway::{to_minor_units, ChargeRequest},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/payment", post(create_payment))
}

#[instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut mp: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let form = FormData::collect(&mut mp).await?;

    let stripe_token = form
        .field("stripeToken")
        .ok_or_else(|| ApiError::bad_request("stripeToken is required"))?;
    let total: f64 = form
        .field("total")
        .ok_or_else(|| ApiError::bad_request("total is required"))?
        .parse()
        .map_err(|_| ApiError::bad_request("total must be a number"))?;
    let description = form.field("productTitle").unwrap_or_default();
    let amount = to_minor_units(total).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let charge = state
        .charges
        .create_charge(ChargeRequest {
            amount,
            currency: state.config.charge.currency.clone(),
            description: description.to_string(),
            source: stripe_token.to_string(),
        })
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "charge creation failed");
            ApiError::Upstream(e.to_string())
        })?;

    // Charge results are not persisted; the processor's response is
    // forwarded as-is.
    info!(user_id = %user.id, amount_minor = amount, "charge created");
    Ok(Json(charge))
}
