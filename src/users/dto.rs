use serde::Serialize;
use uuid::Uuid;

use crate::storage::ImageRef;
use crate::users::repo::User;

/// Public part of an account, embedded in auth responses and expanded
/// offer owners.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub username: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<ImageRef>,
}

impl From<&User> for Account {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            phone: user.phone.clone(),
            avatar: user.avatar.as_ref().map(|a| a.0.clone()),
        }
    }
}

/// Response returned by signup and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub token: String,
    pub account: Account,
}

/// Outcome of one seed-account creation during the admin reset.
#[derive(Debug, Serialize)]
pub struct ResetItem {
    pub email: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregate batch report for the admin reset.
#[derive(Debug, Serialize)]
pub struct ResetReport {
    pub status: String,
    pub deleted_users: u64,
    pub results: Vec<ResetItem>,
}
