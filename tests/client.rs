//! Integration tests for the HTTP client core.
//!
//! Uses wiremock for the backend. Covers bearer injection, the missing-token
//! guard, refresh-and-replay on 401, the auth failure flow, retry on 5xx and
//! cancellation.

mod common;

use std::time::{Duration, Instant};

use common::{api, harness, logged_in};
use orgdash::api::{ApiRequest, Notification, LOGIN_ROUTE};
use orgdash::error::ApiError;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_bearer_token_is_attached() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/events/1")))
    .and(header("authorization", "Bearer access-1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
    .expect(1)
    .mount(&h.server)
    .await;

  let body = h
    .client
    .send(ApiRequest::get("/events/1"), &CancellationToken::new())
    .await
    .expect("request failed");
  assert_eq!(body, json!({"id": 1}));
}

#[tokio::test]
async fn test_missing_token_is_rejected_before_sending() {
  let h = harness().await;

  Mock::given(method("GET"))
    .and(path(api("/members")))
    .respond_with(ResponseTemplate::new(200))
    .expect(0)
    .mount(&h.server)
    .await;

  let result = h
    .client
    .send(ApiRequest::get("/members"), &CancellationToken::new())
    .await;
  assert!(matches!(result, Err(ApiError::MissingToken { path }) if path == "/members"));
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_replays() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .and(header("authorization", "Bearer access-1"))
    .respond_with(ResponseTemplate::new(401))
    .expect(1)
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/events")))
    .and(header("authorization", "Bearer access-2"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
    .expect(1)
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .and(body_json(json!({"refreshToken": "refresh-1"})))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({"token": "access-2", "refreshToken": "refresh-2"})),
    )
    .expect(1)
    .mount(&h.server)
    .await;

  let body = h
    .client
    .send(ApiRequest::get("/events"), &CancellationToken::new())
    .await
    .expect("replay failed");

  assert_eq!(body, json!([{"id": 1}]));
  assert_eq!(h.tokens.get_token().as_deref(), Some("access-2"));
  assert_eq!(h.tokens.get_refresh_token().as_deref(), Some("refresh-2"));
  assert!(h.notifier.drain().is_empty());
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
  let h = logged_in().await;

  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"accessToken": "access-2"}})))
    .mount(&h.server)
    .await;

  h.client
    .refresh_access_token(&CancellationToken::new())
    .await
    .expect("refresh failed");

  assert_eq!(h.tokens.get_token().as_deref(), Some("access-2"));
  assert_eq!(h.tokens.get_refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_second_unauthorized_fails_auth() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/finance/transactions")))
    .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
    .expect(2)
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "access-2"})))
    .expect(1)
    .mount(&h.server)
    .await;

  let result = h
    .client
    .send(ApiRequest::get("/finance/transactions"), &CancellationToken::new())
    .await;

  match result {
    Err(ApiError::Status { status, message, .. }) => {
      assert_eq!(status.as_u16(), 401);
      assert_eq!(message, "Token expired");
    }
    other => panic!("expected 401, got {:?}", other),
  }

  assert_eq!(h.tokens.get_token(), None);
  assert_eq!(h.tokens.get_refresh_token(), None);
  assert!(!h.tokens.is_logged_in());
  assert_eq!(h.tokens.take_redirect().as_deref(), Some("/finance/transactions"));
  assert_eq!(
    h.notifier.drain(),
    vec![Notification::AuthFailed {
      redirect_to: LOGIN_ROUTE.to_string()
    }]
  );
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_fails_auth() {
  let h = harness().await;
  h.tokens.set_tokens("access-1", "").unwrap();

  Mock::given(method("GET"))
    .and(path(api("/news")))
    .respond_with(ResponseTemplate::new(401))
    .expect(1)
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .respond_with(ResponseTemplate::new(200))
    .expect(0)
    .mount(&h.server)
    .await;

  let result = h
    .client
    .send(ApiRequest::get("/news"), &CancellationToken::new())
    .await;

  assert!(matches!(&result, Err(e) if e.is_unauthorized()));
  assert_eq!(h.tokens.get_token(), None);
  assert!(matches!(
    h.notifier.drain().as_slice(),
    [Notification::AuthFailed { .. }]
  ));
}

#[tokio::test]
async fn test_failed_refresh_fails_auth() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/members")))
    .respond_with(ResponseTemplate::new(401))
    .expect(1)
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .respond_with(ResponseTemplate::new(401))
    .expect(1)
    .mount(&h.server)
    .await;

  let result = h
    .client
    .send(ApiRequest::get("/members"), &CancellationToken::new())
    .await;

  assert!(matches!(&result, Err(e) if e.is_unauthorized()));
  assert_eq!(h.tokens.get_token(), None);
  assert_eq!(h.notifier.drain().len(), 1);
}

#[tokio::test]
async fn test_server_error_is_retried_then_succeeds() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/news")))
    .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
    .up_to_n_times(2)
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/news")))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
    .expect(1)
    .mount(&h.server)
    .await;

  let body = h
    .client
    .send(ApiRequest::get("/news"), &CancellationToken::new())
    .await
    .expect("retries exhausted");
  assert_eq!(body, json!([]));

  let notifications = h.notifier.drain();
  assert_eq!(notifications.len(), 2);
  assert_eq!(
    notifications[0],
    Notification::ServerError {
      status: 503,
      message: "Server error (503): maintenance".to_string()
    }
  );
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
  let h = logged_in().await;

  // attempts = 2 retries, so three requests in total
  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(500))
    .expect(3)
    .mount(&h.server)
    .await;

  let result = h
    .client
    .send(ApiRequest::get("/events"), &CancellationToken::new())
    .await;

  assert!(matches!(&result, Err(e) if e.status().map(|s| s.as_u16()) == Some(500)));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
  let h = logged_in().await;

  Mock::given(method("POST"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "title is required"})))
    .expect(1)
    .mount(&h.server)
    .await;

  let request = ApiRequest::post("/events").json(&json!({})).unwrap();
  let result = h.client.send(request, &CancellationToken::new()).await;

  match result {
    Err(e) => {
      assert!(!e.is_retryable());
      assert_eq!(e.user_message(), "HTTP 400 Bad Request: title is required");
    }
    Ok(body) => panic!("expected failure, got {}", body),
  }
  assert!(h.notifier.drain().is_empty());
}

#[tokio::test]
async fn test_too_many_requests_is_retried() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/members")))
    .respond_with(ResponseTemplate::new(429))
    .up_to_n_times(1)
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/members")))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
    .mount(&h.server)
    .await;

  let result = h
    .client
    .send(ApiRequest::get("/members"), &CancellationToken::new())
    .await;
  assert!(result.is_ok());
}

#[tokio::test]
async fn test_retry_after_header_delays_next_attempt() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
    .up_to_n_times(1)
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
    .expect(1)
    .mount(&h.server)
    .await;

  let started = Instant::now();
  let result = h
    .client
    .send(ApiRequest::get("/events"), &CancellationToken::new())
    .await;

  assert!(result.is_ok());
  // The configured backoff is 10ms; the server asked for a second
  assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/finance/summary")))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({}))
        .set_delay(Duration::from_secs(5)),
    )
    .mount(&h.server)
    .await;

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(50)).await;
    trigger.cancel();
  });

  let started = Instant::now();
  let result = h.client.send(ApiRequest::get("/finance/summary"), &cancel).await;

  assert!(matches!(result, Err(ApiError::Cancelled)));
  assert!(started.elapsed() < Duration::from_secs(2));

  let requests = h.server.received_requests().await.unwrap_or_default();
  assert_eq!(requests.len(), 1, "cancelled requests must not be retried");
}

#[tokio::test]
async fn test_empty_body_is_null() {
  let h = logged_in().await;

  Mock::given(method("DELETE"))
    .and(path(api("/news/9")))
    .respond_with(ResponseTemplate::new(204))
    .mount(&h.server)
    .await;

  let body = h
    .client
    .send(ApiRequest::delete("/news/9"), &CancellationToken::new())
    .await
    .unwrap();
  assert!(body.is_null());
}

#[tokio::test]
async fn test_invalid_json_is_reported() {
  let h = logged_in().await;

  Mock::given(method("GET"))
    .and(path(api("/events/1")))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
    .mount(&h.server)
    .await;

  let result = h
    .client
    .send(ApiRequest::get("/events/1"), &CancellationToken::new())
    .await;
  assert!(matches!(result, Err(ApiError::InvalidResponse { .. })));
}
