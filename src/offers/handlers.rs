use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use futures::future::try_join_all;
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractor::AuthUser,
    error::{ApiError, ApiResult},
    form::FormData,
    offers::{
        details::OfferDetails,
        dto::{ListQuery, ListResponse, OfferResponse},
        repo::{Offer, OfferRow},
    },
    state::AppState,
    storage::offer_folder,
};

const MAX_NAME_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_PRICE: f64 = 100_000.0;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/offers", get(list_offers))
        .route("/offer/:id", get(get_offer))
        .route("/offer/publish", post(publish_offer))
        .route("/offer/update/:id", put(update_offer))
        .route("/offer/delete/:id", delete(delete_offer))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state))]
pub async fn list_offers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let filters = query.normalize();
    let (count, rows) = Offer::list(&state.db, &filters).await?;
    Ok(Json(ListResponse {
        count,
        offers: rows.into_iter().map(OfferResponse::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OfferResponse>> {
    let id = parse_offer_id(&id)?;
    match Offer::find_by_id(&state.db, id).await? {
        Some(row) => Ok(Json(OfferResponse::from(row))),
        None => {
            warn!(%id, "offer not found");
            Err(ApiError::bad_request("Offer not found"))
        }
    }
}

#[instrument(skip_all)]
pub async fn publish_offer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<OfferResponse>)> {
    let form = FormData::collect(&mut mp).await?;

    let (Some(title), Some(price_field)) = (form.field("title"), form.field("price")) else {
        return Err(ApiError::bad_request("title, price and picture are required"));
    };
    if form.files().next().is_none() {
        return Err(ApiError::bad_request("title, price and picture are required"));
    }
    let price: f64 = price_field
        .parse()
        .map_err(|_| ApiError::bad_request("price must be a number"))?;
    let description = form.field("description");
    validate_caps(title, description, price)?;

    let details = OfferDetails {
        brand: form.field("brand").map(String::from),
        size: form.field("size").map(String::from),
        condition: form.field("condition").map(String::from),
        color: form.field("color").map(String::from),
        location: form.field("city").map(String::from),
    };

    // Id is fixed before any upload so the folder can be keyed by it.
    let offer_id = Uuid::new_v4();
    let folder = offer_folder(&state.config.storage.namespace, &offer_id);

    // Dispatch every upload, then join on all of them; the row is only
    // inserted once each one has reported success.
    let uploads = form.files().map(|file| {
        let storage = state.storage.clone();
        let key = format!("{}/{}", folder, file.field);
        let body = file.body.clone();
        let content_type = file.content_type.clone();
        async move { storage.put_object(&key, body, &content_type).await }
    });
    let pictures = try_join_all(uploads).await.map_err(|e| {
        error!(error = %e, %offer_id, "picture upload failed");
        ApiError::Upstream(e.to_string())
    })?;
    let pictures = serde_json::to_value(&pictures)
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let details_value = details.to_value();
    let product_date = Offer::insert(
        &state.db,
        offer_id,
        title,
        description,
        price,
        &details_value,
        &pictures,
        user.id,
    )
    .await
    .map_err(|e| {
        error!(error = %e, %offer_id, "insert offer failed");
        ApiError::Upstream(e.to_string())
    })?;

    info!(%offer_id, owner = %user.id, "offer published");
    let row = OfferRow {
        id: offer_id,
        product_name: title.to_string(),
        product_description: description.map(String::from),
        product_price: price,
        product_details: details_value,
        product_pictures: pictures,
        product_image: None,
        product_date,
        owner: user.id,
        owner_username: user.username.clone(),
        owner_phone: user.phone.clone(),
        owner_avatar: user
            .avatar
            .as_ref()
            .and_then(|a| serde_json::to_value(&a.0).ok()),
    };
    Ok((StatusCode::CREATED, Json(OfferResponse::from(row))))
}

#[instrument(skip_all, fields(id = %id))]
pub async fn update_offer(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
    mut mp: Multipart,
) -> ApiResult<Json<&'static str>> {
    let id = parse_offer_id(&id)?;
    let row = Offer::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Offer not found"))?;

    let form = FormData::collect(&mut mp).await?;

    let name = form.field("title").unwrap_or(&row.product_name).to_string();
    let description = form
        .field("description")
        .map(String::from)
        .or(row.product_description);
    let price = match form.field("price") {
        Some(p) => p
            .parse()
            .map_err(|_| ApiError::bad_request("price must be a number"))?,
        None => row.product_price,
    };
    validate_caps(&name, description.as_deref(), price)?;

    // Only entries present in the request are overwritten.
    let mut details = OfferDetails::from_value(&row.product_details);
    details.apply(&OfferDetails {
        brand: form.field("brand").map(String::from),
        size: form.field("size").map(String::from),
        condition: form.field("condition").map(String::from),
        color: form.field("color").map(String::from),
        location: form.field("location").map(String::from),
    });

    let mut image = row.product_image;
    if let Some(file) = form.file("picture") {
        let key = format!(
            "{}/preview",
            offer_folder(&state.config.storage.namespace, &id)
        );
        let uploaded = state
            .storage
            .put_object(&key, file.body.clone(), &file.content_type)
            .await
            .map_err(|e| {
                error!(error = %e, %id, "preview upload failed");
                ApiError::Upstream(e.to_string())
            })?;
        image = serde_json::to_value(&uploaded).ok();
    }

    Offer::update(
        &state.db,
        id,
        &name,
        description.as_deref(),
        price,
        &details.to_value(),
        image.as_ref(),
    )
    .await?;

    info!(%id, "offer updated");
    Ok(Json("Offer modified succesfully !"))
}

#[instrument(skip_all, fields(id = %id))]
pub async fn delete_offer(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_offer_id(&id)?;
    if Offer::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::bad_request("Bad request"));
    }

    // Blobs first, then the folder, then the row.
    let folder = offer_folder(&state.config.storage.namespace, &id);
    state.storage.delete_prefix(&folder).await.map_err(|e| {
        error!(error = %e, %id, "blob prefix delete failed");
        ApiError::Upstream(e.to_string())
    })?;
    state.storage.delete_folder(&folder).await.map_err(|e| {
        error!(error = %e, %id, "blob folder delete failed");
        ApiError::Upstream(e.to_string())
    })?;

    Offer::delete(&state.db, id).await?;
    info!(%id, "offer deleted");
    Ok(Json(json!({
        "message": "Your offer has been successfully deleted."
    })))
}

fn parse_offer_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>()
        .map_err(|_| ApiError::bad_request("Invalid offer id"))
}

fn validate_caps(name: &str, description: Option<&str>, price: f64) -> Result<(), ApiError> {
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request("title must be 50 characters or less"));
    }
    if description.map(|d| d.chars().count()).unwrap_or(0) > MAX_DESCRIPTION_LEN {
        return Err(ApiError::bad_request(
            "description must be 500 characters or less",
        ));
    }
    if !(0.0..=MAX_PRICE).contains(&price) {
        return Err(ApiError::bad_request("price must be between 0 and 100000"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_enforced() {
        assert!(validate_caps("Shirt", None, 20.0).is_ok());
        assert!(validate_caps(&"x".repeat(51), None, 20.0).is_err());
        assert!(validate_caps("Shirt", Some(&"d".repeat(501)), 20.0).is_err());
        assert!(validate_caps("Shirt", None, 100_000.5).is_err());
        assert!(validate_caps("Shirt", None, -1.0).is_err());
        assert!(validate_caps(&"x".repeat(50), Some(&"d".repeat(500)), 100_000.0).is_ok());
    }

    #[test]
    fn offer_id_parsing() {
        assert!(parse_offer_id("not-a-uuid").is_err());
        assert!(parse_offer_id("592b8ef7-12b5-4b3f-a2f3-7c1c0e84a1a5").is_ok());
    }
}
