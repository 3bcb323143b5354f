use super::{error_response, BridgeState};
use crate::provider::{
    update_rejection, CredentialInput, CredentialType, ProviderError, UserFederation, PASSWORD,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct CredentialRequest {
    username: String,
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

impl std::fmt::Debug for CredentialRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRequest")
            .field("username", &self.username)
            .field("kind", &self.kind)
            .field("value", &"***")
            .finish()
    }
}

impl CredentialRequest {
    fn input(self) -> CredentialInput {
        CredentialInput::new(
            CredentialType::from(self.kind.as_str()),
            SecretString::from(self.value),
        )
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
}

fn rejection_response(err: &ProviderError) -> axum::response::Response {
    match err {
        ProviderError::ReadOnly => error_response(StatusCode::FORBIDDEN, err.to_string()),
        ProviderError::UnsupportedCredentialType(_) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

#[utoipa::path(
    post,
    path= "/v1/credentials/validate",
    request_body = CredentialRequest,
    responses (
        (status = 200, description = "Whether the credential matches; unknown users never match", body = Validation),
        (status = 400, description = "Missing payload or unsupported credential type", body = super::ErrorBody),
    ),
    tag= "credentials"
)]
#[instrument(skip(state, payload))]
pub async fn validate(
    Extension(state): Extension<BridgeState>,
    payload: Option<Json<CredentialRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let username = request.username.clone();
    let input = request.input();
    if *input.kind() != CredentialType::Password {
        return rejection_response(&ProviderError::UnsupportedCredentialType(
            input.kind().to_string(),
        ));
    }

    let Some(mut provider) = state.provider().await else {
        return Json(Validation { valid: false }).into_response();
    };

    let Some(user) = provider.user_by_username(&username).await else {
        debug!("credential check for unknown user");
        return Json(Validation { valid: false }).into_response();
    };

    match provider.is_valid(&user, &input) {
        Ok(valid) => {
            debug!(account_id = user.id(), valid, "credential checked");
            Json(Validation { valid }).into_response()
        }
        Err(err) => rejection_response(&err),
    }
}

#[utoipa::path(
    put,
    path= "/v1/credentials",
    request_body = CredentialRequest,
    responses (
        (status = 403, description = "Passwords are managed externally", body = super::ErrorBody),
        (status = 400, description = "Missing payload or unsupported credential type", body = super::ErrorBody),
    ),
    tag= "credentials"
)]
#[instrument(skip(payload))]
pub async fn update(payload: Option<Json<CredentialRequest>>) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let input = request.input();
    let err = update_rejection(input.kind());
    warn!(kind = %input.kind(), "rejected credential update");

    rejection_response(&err)
}

#[utoipa::path(
    get,
    path= "/v1/credentials/types",
    responses (
        (status = 200, description = "Credential types this provider validates", body = [String]),
    ),
    tag= "credentials"
)]
pub async fn types() -> impl IntoResponse {
    Json(vec![PASSWORD])
}
