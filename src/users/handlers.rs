use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::credentials::{derive_hash, generate_salt, generate_token},
    error::{ApiError, ApiResult},
    form::FormData,
    state::AppState,
    storage::user_folder,
    users::{
        dto::{Account, AuthResponse, ResetItem, ResetReport},
        repo::User,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(signup))
        .route("/user/login", post(login))
        .route("/reset-users", get(reset_users))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, mp))]
pub async fn signup(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> ApiResult<Json<AuthResponse>> {
    let form = FormData::collect(&mut mp).await?;

    let email = form
        .field("email")
        .map(|e| e.trim().to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Email is required !"))?;
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    // The duplicate check comes first so a taken email always answers 409,
    // whatever else is wrong with the request.
    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict(format!(
            "This email ({}) allready exist !",
            email
        )));
    }

    let username = form
        .field("username")
        .ok_or_else(|| ApiError::bad_request("Username is required !"))?;
    let password = form
        .field("password")
        .ok_or_else(|| ApiError::bad_request("Password is required !"))?;
    let phone = form.field("phone");

    // Fresh salt per account, generated at signup time.
    let salt = generate_salt();
    let hash = derive_hash(password, &salt);
    let token = generate_token();

    // Id is fixed up front so the avatar folder can be keyed by it.
    let user_id = Uuid::new_v4();

    // Avatar goes up first; an upload failure fails the whole signup.
    let mut avatar = None;
    if let Some(file) = form.file("avatar") {
        let key = format!(
            "{}/avatar",
            user_folder(&state.config.storage.namespace, &user_id)
        );
        let image = state
            .storage
            .put_object(&key, file.body.clone(), &file.content_type)
            .await
            .map_err(|e| {
                error!(error = %e, %user_id, "avatar upload failed");
                ApiError::Upstream(e.to_string())
            })?;
        avatar = Some(image);
    }

    let user = User::create(
        &state.db,
        user_id,
        &email,
        username,
        phone,
        avatar.as_ref(),
        &salt,
        &hash,
        &token,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "create user failed");
        ApiError::Upstream(e.to_string())
    })?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok(Json(AuthResponse {
        id: user.id,
        token: user.token.clone(),
        account: Account::from(&user),
    }))
}

#[instrument(skip(state, mp))]
pub async fn login(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> ApiResult<Json<AuthResponse>> {
    let form = FormData::collect(&mut mp).await?;

    let email = form
        .field("email")
        .map(|e| e.trim().to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Email is required !"))?;
    let password = form
        .field("password")
        .ok_or_else(|| ApiError::bad_request("Password is required !"))?;

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::unauthorized("Unauthorized"));
        }
    };

    if derive_hash(password, &user.salt) != user.hash {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Unauthorized"));
    }

    // Issue a new token and persist it so it stays valid for auth.
    let token = generate_token();
    User::set_token(&state.db, user.id, &token).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        id: user.id,
        token,
        account: Account::from(&user),
    }))
}

/// Demo accounts recreated by the admin reset.
const SEED_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("marie@friperie.test", "Marie", "azerty123"),
    ("paul@friperie.test", "Paul", "azerty123"),
    ("lea@friperie.test", "Léa", "azerty123"),
];

#[instrument(skip(state, headers))]
pub async fn reset_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ResetReport>> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::bad_request("Missing Authorization header"))?;

    if header != state.config.admin_token {
        warn!("admin reset with wrong token");
        return Err(ApiError::unauthorized("Unauthorized"));
    }

    let namespace = &state.config.storage.namespace;

    // Best-effort blob cleanup before the wipe; failures are logged and
    // do not abort the reset.
    for offer_id in crate::offers::repo::Offer::all_ids(&state.db).await? {
        let folder = crate::storage::offer_folder(namespace, &offer_id);
        if let Err(e) = state.storage.delete_prefix(&folder).await {
            warn!(error = %e, %offer_id, "offer blob cleanup failed");
        }
    }
    for user in User::list_all(&state.db).await? {
        let folder = user_folder(namespace, &user.id);
        if let Err(e) = state.storage.delete_prefix(&folder).await {
            warn!(error = %e, user_id = %user.id, "avatar cleanup failed");
        }
    }

    let deleted_users = User::delete_all(&state.db).await?;

    // Sequential best-effort seed creation; each outcome is reported
    // individually and the loop never short-circuits.
    let mut results = Vec::with_capacity(SEED_ACCOUNTS.len());
    for (email, username, password) in SEED_ACCOUNTS {
        let salt = generate_salt();
        let hash = derive_hash(password, &salt);
        let token = generate_token();
        let outcome = User::create(
            &state.db,
            Uuid::new_v4(),
            email,
            username,
            None,
            None,
            &salt,
            &hash,
            &token,
        )
        .await;
        match outcome {
            Ok(_) => results.push(ResetItem {
                email: email.to_string(),
                ok: true,
                message: None,
            }),
            Err(e) => {
                error!(error = %e, email, "seed account creation failed");
                results.push(ResetItem {
                    email: email.to_string(),
                    ok: false,
                    message: Some(e.to_string()),
                });
            }
        }
    }

    let status = if results.iter().all(|r| r.ok) {
        "ok"
    } else {
        "partial"
    };
    info!(deleted_users, status, "admin reset done");
    Ok(Json(ResetReport {
        status: status.to_string(),
        deleted_users,
        results,
    }))
}
