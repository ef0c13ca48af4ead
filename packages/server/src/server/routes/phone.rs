//! Phone verification routes
//!
//! `POST /api/phone/send-otp`   `{ "phone": string }`
//! `POST /api/phone/verify-otp` `{ "code": string }`
//! `GET  /api/phone/status`
//!
//! Every outcome uses the `{ success, message }` envelope. Failures never
//! carry internal detail.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domains::phone_verification::{
    issue_otp, verify_otp, Delivery, OtpIssued, PhoneVerified, VerificationError,
};
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
    /// Fallback channel: set only when the code could not be sent by SMS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_for_testing: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhoneStatusResponse {
    pub success: bool,
    pub phone: Option<String>,
    pub phone_verified: bool,
    pub phone_verified_at: Option<DateTime<Utc>>,
}

impl From<OtpIssued> for OtpResponse {
    fn from(issued: OtpIssued) -> Self {
        let message = match issued.delivery {
            Delivery::Sent => "OTP sent successfully",
            Delivery::SendFailed | Delivery::NotConfigured => "OTP generated (SMS unavailable)",
        };

        Self {
            success: true,
            message: message.to_string(),
            code_for_testing: issued.code_for_testing,
        }
    }
}

impl From<PhoneVerified> for OtpResponse {
    fn from(_: PhoneVerified) -> Self {
        Self {
            success: true,
            message: "Phone number verified successfully".to_string(),
            code_for_testing: None,
        }
    }
}

fn status_code(err: &VerificationError) -> StatusCode {
    match err {
        VerificationError::Unauthenticated => StatusCode::UNAUTHORIZED,
        VerificationError::InvalidArgument(_) | VerificationError::InvalidCode => {
            StatusCode::BAD_REQUEST
        }
        VerificationError::NotFound => StatusCode::NOT_FOUND,
        VerificationError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
        VerificationError::Expired => StatusCode::GONE,
        VerificationError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for VerificationError {
    fn into_response(self) -> Response {
        let body = OtpResponse {
            success: false,
            message: self.to_string(),
            code_for_testing: None,
        };
        (status_code(&self), Json(body)).into_response()
    }
}

/// Run an action to completion on its own task.
///
/// A client disconnect drops the handler future; spawning keeps the action
/// from stopping between persisting a challenge and attempting delivery.
async fn run_detached<T, F>(action: F) -> Result<T, VerificationError>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T, VerificationError>> + Send + 'static,
{
    match tokio::spawn(action).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Phone verification task aborted");
            Err(VerificationError::internal(
                "Internal server error",
                anyhow::Error::new(e),
            ))
        }
    }
}

/// Issue an OTP for the authenticated owner
pub async fn send_otp_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Response {
    let owner_id = auth_user.map(|Extension(user)| user.owner_id);
    // Malformed bodies and non-string phones read as "missing"
    let phone = match payload {
        Ok(Json(body)) => body.phone.unwrap_or_default(),
        Err(rejection) => {
            debug!("Rejected send-otp body: {}", rejection);
            String::new()
        }
    };

    let deps = state.deps.clone();
    match run_detached(async move { issue_otp(owner_id, &phone, &deps).await }).await {
        Ok(issued) => (StatusCode::OK, Json(OtpResponse::from(issued))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Verify a submitted OTP for the authenticated owner
pub async fn verify_otp_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Response {
    let owner_id = auth_user.map(|Extension(user)| user.owner_id);
    let code = match payload {
        Ok(Json(body)) => body.code.unwrap_or_default(),
        Err(rejection) => {
            debug!("Rejected verify-otp body: {}", rejection);
            String::new()
        }
    };

    let deps = state.deps.clone();
    match run_detached(async move { verify_otp(owner_id, &code, &deps).await }).await {
        Ok(verified) => (StatusCode::OK, Json(OtpResponse::from(verified))).into_response(),
        Err(e) => {
            debug!(reissue_required = e.requires_reissue(), "OTP verification rejected: {}", e);
            e.into_response()
        }
    }
}

/// Current phone verification state of the authenticated owner
pub async fn phone_status_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
) -> Response {
    let Some(Extension(user)) = auth_user else {
        return VerificationError::Unauthenticated.into_response();
    };

    let lookup = tokio::time::timeout(
        state.deps.otp.call_timeout,
        state.deps.profile_store.find_profile(user.owner_id),
    )
    .await;

    match lookup {
        Ok(Ok(profile)) => {
            let body = match profile {
                Some(p) => PhoneStatusResponse {
                    success: true,
                    phone: p.phone,
                    phone_verified: p.phone_verified,
                    phone_verified_at: p.phone_verified_at,
                },
                None => PhoneStatusResponse {
                    success: true,
                    phone: None,
                    phone_verified: false,
                    phone_verified_at: None,
                },
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => {
            error!(owner_id = %user.owner_id, error = %format!("{:#}", e), "Profile lookup failed");
            VerificationError::internal("Internal server error", e).into_response()
        }
        Err(elapsed) => {
            error!(owner_id = %user.owner_id, "Profile lookup timed out");
            VerificationError::internal("Internal server error", anyhow::Error::new(elapsed))
                .into_response()
        }
    }
}
