use super::{error_response, BridgeState};
use crate::{directory::Account, provider::UserFederation};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LookupBy {
    Username,
    Email,
    Id,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserLookup {
    by: LookupBy,
    value: String,
}

/// Account attributes as exposed to the host.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserView {
    pub id: String,
    pub storage_id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
    pub enabled: bool,
}

impl UserView {
    fn new(account: &Account, storage_id: String) -> Self {
        Self {
            id: account.id().to_string(),
            storage_id,
            username: account.username().to_string(),
            email: account.email().to_string(),
            first_name: account.first_name().to_string(),
            last_name: account.last_name().to_string(),
            email_verified: account.email_verified(),
            enabled: account.enabled(),
        }
    }
}

#[utoipa::path(
    post,
    path= "/v1/users/lookup",
    request_body = UserLookup,
    responses (
        (status = 200, description = "Active account found", body = UserView, content_type = "application/json"),
        (status = 400, description = "Missing or invalid payload", body = super::ErrorBody),
        (status = 404, description = "No active account matches", body = super::ErrorBody),
    ),
    tag= "users"
)]
#[instrument(skip(state, payload))]
pub async fn lookup(
    Extension(state): Extension<BridgeState>,
    payload: Option<Json<UserLookup>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    debug!(by = ?request.by, "user lookup");

    let Some(mut provider) = state.provider().await else {
        return error_response(StatusCode::NOT_FOUND, "User not found");
    };

    let account = match request.by {
        LookupBy::Username => provider.user_by_username(&request.value).await,
        LookupBy::Email => provider.user_by_email(&request.value).await,
        LookupBy::Id => provider.user_by_id(&request.value).await,
    };

    match account {
        Some(account) => {
            let storage_id = provider.storage_id(&account).to_string();
            (StatusCode::OK, Json(UserView::new(&account, storage_id))).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "User not found"),
    }
}
