use reqwest::StatusCode;

use mabot_api::error::{excerpt, BODY_EXCERPT_CHARS};
use mabot_api::MabotError;

#[test]
fn request_error_truncates_long_bodies() {
    let body = "x".repeat(BODY_EXCERPT_CHARS * 3);
    let error = MabotError::request(StatusCode::BAD_GATEWAY, &body);
    match error {
        MabotError::Request { status, body } => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert_eq!(body.chars().count(), BODY_EXCERPT_CHARS);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn excerpt_respects_multibyte_boundaries() {
    let body = "ñ".repeat(BODY_EXCERPT_CHARS + 5);
    assert_eq!(excerpt(&body).chars().count(), BODY_EXCERPT_CHARS);
}

#[test]
fn auth_error_display_includes_status_when_known() {
    let error = MabotError::auth(Some(StatusCode::UNAUTHORIZED), "bad credentials");
    assert_eq!(
        error.to_string(),
        "MABOT auth failed (HTTP 401): bad credentials"
    );
    assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(error.is_auth());

    let error = MabotError::auth(None, "no refresh token available");
    assert_eq!(
        error.to_string(),
        "MABOT auth failed: no refresh token available"
    );
}

#[test]
fn format_error_reports_status() {
    let error = MabotError::format(StatusCode::OK, "<html>");
    assert_eq!(error.status(), Some(StatusCode::OK));
    assert_eq!(error.to_string(), "MABOT non-JSON response: HTTP 200 OK <html>");
}
