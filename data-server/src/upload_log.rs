//! Diagnostic sink for image upload outcomes reported by the storefront.
//!
//! The endpoint never rejects a well-formed report: it logs it and answers
//! `{"logged": true}`. Anything that prevents logging, an unparseable body
//! included, answers 500 `{"logged": false}`.

use axum::{body::Bytes, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct UploadReport {
    pub success: bool,
    pub key: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Logged {
    pub logged: bool,
}

pub async fn log_upload(body: Bytes) -> (StatusCode, Json<Logged>) {
    let report: UploadReport = match serde_json::from_slice(&body) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "could not record upload report");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(Logged { logged: false }));
        }
    };

    if report.success {
        info!(key = %report.key, url = report.url.as_deref().unwrap_or(""), "image upload succeeded");
    } else {
        warn!(
            key = %report.key,
            error = report.error.as_deref().unwrap_or("unknown"),
            "image upload failed"
        );
    }
    (StatusCode::OK, Json(Logged { logged: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_upload_is_logged() {
        let (status, Json(body)) =
            log_upload(Bytes::from_static(br#"{"success":true,"key":"listings/a.jpg","url":"https://cdn/a.jpg"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Logged { logged: true });
    }

    #[tokio::test]
    async fn failed_upload_is_still_logged() {
        let (status, Json(body)) =
            log_upload(Bytes::from_static(br#"{"success":false,"key":"k","error":"too large"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.logged);
    }

    #[tokio::test]
    async fn unparseable_body_answers_500() {
        let (status, Json(body)) = log_upload(Bytes::from_static(b"{not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, Logged { logged: false });
    }

    #[tokio::test]
    async fn missing_key_answers_500() {
        let (status, _) = log_upload(Bytes::from_static(br#"{"success":true}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
