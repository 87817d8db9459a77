//! Integration tests for the domain modules.
//!
//! Uses wiremock for the backend. Covers list normalization and paging,
//! read degradation and the offline cache, cache invalidation on writes,
//! login/logout, finance and uploads.

mod common;

use common::{api, cached, harness, logged_in, uncached};
use orgdash::api::Notification;
use orgdash::cache::CacheSource;
use orgdash::dashboard::{Id, ListParams, SummaryPeriod, UploadFile};
use orgdash::error::ApiError;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn events(range: std::ops::Range<u32>) -> Value {
  Value::Array(
    range
      .map(|i| json!({"id": i, "title": format!("Event {}", i)}))
      .collect(),
  )
}

#[tokio::test]
async fn test_bare_array_list_is_normalized() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .and(query_param("page", "1"))
    .and(query_param("limit", "10"))
    .respond_with(ResponseTemplate::new(200).set_body_json(events(0..15)))
    .mount(&h.server)
    .await;

  let page = dashboard
    .events()
    .list(&ListParams::default(), &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(page.data.len(), 15);
  assert_eq!(page.data[3].title, "Event 3");
  assert_eq!(page.meta.page, 1);
  assert_eq!(page.meta.limit, 10);
  assert_eq!(page.meta.total_pages, 2);
  assert_eq!(page.meta.total_count, Some(15));
}

#[tokio::test]
async fn test_wrapped_list_uses_first_array() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/members")))
    .and(query_param("search", "ada"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "success": true,
      "members": [{"id": "m-1", "firstName": "Ada", "lastName": "Lovelace"}],
      "roles": ["admin"]
    })))
    .mount(&h.server)
    .await;

  let page = dashboard
    .members()
    .list(&ListParams::default().search("ada"), &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(page.data.len(), 1);
  assert_eq!(page.data[0].id, Id::Text("m-1".into()));
  assert_eq!(page.data[0].full_name(), "Ada Lovelace");
  assert_eq!(page.meta.total_pages, 1);
}

#[tokio::test]
async fn test_find_member_by_email() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/members")))
    .and(query_param("search", "ada@example.org"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([
      {"id": 1, "firstName": "Adam", "email": "adam@example.org"},
      {"id": 2, "firstName": "Ada", "email": "Ada@Example.org"}
    ])))
    .mount(&h.server)
    .await;

  let member = dashboard
    .members()
    .find_by_email(" ada@example.org ", &CancellationToken::new())
    .await
    .unwrap()
    .expect("member not found");
  assert_eq!(member.id, Id::Number(2));
}

#[tokio::test]
async fn test_list_all_walks_canonical_pages() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  for (page, items) in [("1", events(0..2)), ("2", events(2..4)), ("3", events(4..5))] {
    Mock::given(method("GET"))
      .and(path(api("/meeting-minutes")))
      .and(query_param("page", page))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": items,
        "meta": {"page": page.parse::<u32>().unwrap(), "limit": 2, "total_pages": 3, "total_count": 5}
      })))
      .expect(1)
      .mount(&h.server)
      .await;
  }

  let all = dashboard
    .meeting_minutes()
    .list_all(&ListParams::default().limit(2), &CancellationToken::new())
    .await
    .unwrap();

  let ids: Vec<Id> = all.into_iter().map(|m| m.id).collect();
  assert_eq!(ids, (0..5).map(|i| Id::Number(i)).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_list_all_stops_when_pagination_is_ignored() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(200).set_body_json(events(0..25)))
    .expect(1)
    .mount(&h.server)
    .await;

  let all = dashboard
    .events()
    .list_all(&ListParams::default(), &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(all.len(), 25);
}

#[tokio::test]
async fn test_list_degrades_to_empty_page() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/news")))
    .respond_with(ResponseTemplate::new(500))
    .mount(&h.server)
    .await;

  let result = dashboard
    .news()
    .list_cached(&ListParams::default().page(2), &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.source, CacheSource::Unavailable);
  assert!(result.data.data.is_empty());
  assert_eq!(result.data.meta.page, 2);
  assert_eq!(result.data.meta.total_pages, 1);
}

#[tokio::test]
async fn test_list_surfaces_missing_session() {
  let h = harness().await;
  let dashboard = uncached(&h);

  let result = dashboard
    .events()
    .list(&ListParams::default(), &CancellationToken::new())
    .await;
  assert!(matches!(result, Err(ApiError::MissingToken { .. })));
}

#[tokio::test]
async fn test_get_propagates_not_found() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/events/404")))
    .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Event not found"})))
    .expect(1)
    .mount(&h.server)
    .await;

  let result = dashboard
    .events()
    .get(&Id::Number(404), &CancellationToken::new())
    .await;
  assert!(matches!(result, Err(e) if e.status().map(|s| s.as_u16()) == Some(404)));
}

#[tokio::test]
async fn test_stale_cache_is_served_offline() {
  let h = logged_in().await;
  // Negative stale time: every entry is stale, so every read refetches
  let dashboard = cached(&h, chrono::Duration::seconds(-1));

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(200).set_body_json(events(0..3)))
    .up_to_n_times(1)
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(502))
    .mount(&h.server)
    .await;

  let cancel = CancellationToken::new();
  let first = dashboard
    .events()
    .list_cached(&ListParams::default(), &cancel)
    .await
    .unwrap();
  assert_eq!(first.source, CacheSource::Network);

  let second = dashboard
    .events()
    .list_cached(&ListParams::default(), &cancel)
    .await
    .unwrap();
  assert_eq!(second.source, CacheSource::Offline);
  assert!(second.cached_at.is_some());
  assert_eq!(second.data.data.len(), 3);
}

#[tokio::test]
async fn test_fresh_cache_skips_network_until_write() {
  let h = logged_in().await;
  let dashboard = cached(&h, chrono::Duration::minutes(5));

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(200).set_body_json(events(0..2)))
    .expect(2)
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/events")))
    .and(body_json(json!({"title": "Picnic"})))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 7, "title": "Picnic"}})))
    .expect(1)
    .mount(&h.server)
    .await;

  let cancel = CancellationToken::new();
  let params = ListParams::default();

  let first = dashboard.events().list_cached(&params, &cancel).await.unwrap();
  let second = dashboard.events().list_cached(&params, &cancel).await.unwrap();
  assert_eq!(first.source, CacheSource::Network);
  assert_eq!(second.source, CacheSource::CacheFresh);

  let created = dashboard
    .events()
    .create(&json!({"title": "Picnic"}), &cancel)
    .await
    .unwrap();
  assert_eq!(created.id, Id::Number(7));

  let third = dashboard.events().list_cached(&params, &cancel).await.unwrap();
  assert_eq!(third.source, CacheSource::Network);
}

#[tokio::test]
async fn test_auth_failure_is_not_masked_by_stale_cache() {
  let h = logged_in().await;
  let dashboard = cached(&h, chrono::Duration::seconds(-1));

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(200).set_body_json(events(0..1)))
    .up_to_n_times(1)
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(401))
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .respond_with(ResponseTemplate::new(401))
    .expect(1)
    .mount(&h.server)
    .await;

  let cancel = CancellationToken::new();
  let params = ListParams::default();

  let first = dashboard.events().list_cached(&params, &cancel).await.unwrap();
  assert_eq!(first.source, CacheSource::Network);

  let second = dashboard.events().list_cached(&params, &cancel).await;
  assert!(matches!(&second, Err(e) if e.is_unauthorized()), "got {:?}", second.map(|r| r.source));
  assert_eq!(h.tokens.get_token(), None);
  assert!(matches!(
    h.notifier.drain().as_slice(),
    [Notification::AuthFailed { .. }]
  ));

  let third = dashboard.events().list_cached(&params, &cancel).await;
  assert!(matches!(third, Err(ApiError::MissingToken { .. })));
}

#[tokio::test]
async fn test_fresh_cache_is_not_served_without_token() {
  let h = logged_in().await;
  let dashboard = cached(&h, chrono::Duration::minutes(5));

  Mock::given(method("GET"))
    .and(path(api("/members")))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "email": "a@example.org"}])))
    .expect(1)
    .mount(&h.server)
    .await;

  let cancel = CancellationToken::new();
  let params = ListParams::default();

  let first = dashboard.members().list_cached(&params, &cancel).await.unwrap();
  assert_eq!(first.source, CacheSource::Network);

  h.tokens.clear_tokens().unwrap();

  let second = dashboard.members().list_cached(&params, &cancel).await;
  assert!(matches!(second, Err(ApiError::MissingToken { .. })));
}

#[tokio::test]
async fn test_auth_failure_clears_list_cache() {
  let h = logged_in().await;
  let dashboard = cached(&h, chrono::Duration::minutes(5));

  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(200).set_body_json(events(0..2)))
    .up_to_n_times(1)
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/events")))
    .respond_with(ResponseTemplate::new(503))
    .mount(&h.server)
    .await;
  Mock::given(method("GET"))
    .and(path(api("/events/1")))
    .respond_with(ResponseTemplate::new(401))
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .respond_with(ResponseTemplate::new(401))
    .mount(&h.server)
    .await;

  let cancel = CancellationToken::new();
  let params = ListParams::default();

  let first = dashboard.events().list_cached(&params, &cancel).await.unwrap();
  assert_eq!(first.source, CacheSource::Network);

  let item = dashboard.events().get(&Id::Number(1), &cancel).await;
  assert!(matches!(&item, Err(e) if e.is_unauthorized()));

  // A new session must not see pages cached under the old one
  h.tokens.set_tokens("access-2", "refresh-2").unwrap();
  let after = dashboard.events().list_cached(&params, &cancel).await.unwrap();
  assert_eq!(after.source, CacheSource::Unavailable);
  assert!(after.data.data.is_empty());
}

#[tokio::test]
async fn test_update_and_delete() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("PUT"))
    .and(path(api("/news/12")))
    .and(body_json(json!({"title": "Updated", "published": true})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "id": 12, "title": "Updated", "isPublished": true
    })))
    .expect(1)
    .mount(&h.server)
    .await;
  Mock::given(method("DELETE"))
    .and(path(api("/news/12")))
    .respond_with(ResponseTemplate::new(204))
    .expect(1)
    .mount(&h.server)
    .await;

  let cancel = CancellationToken::new();
  let article = dashboard
    .news()
    .update(
      &Id::from("12"),
      &json!({"title": "Updated", "published": true}),
      &cancel,
    )
    .await
    .unwrap();
  assert!(article.published);

  dashboard.news().delete(&Id::Number(12), &cancel).await.unwrap();
}

#[tokio::test]
async fn test_login_stores_tokens() {
  let h = harness().await;
  let dashboard = uncached(&h);
  h.tokens.remember_redirect("/finance").unwrap();

  Mock::given(method("POST"))
    .and(path(api("/auth/login")))
    .and(body_json(json!({"email": "admin@example.org", "password": "hunter2"})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "success": true,
      "data": {"accessToken": "access-9", "refreshToken": "refresh-9"}
    })))
    .expect(1)
    .mount(&h.server)
    .await;

  let outcome = dashboard
    .auth()
    .login("admin@example.org", "hunter2", &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.redirect_to.as_deref(), Some("/finance"));
  assert_eq!(h.tokens.get_token().as_deref(), Some("access-9"));
  assert_eq!(h.tokens.get_refresh_token().as_deref(), Some("refresh-9"));

  let status = dashboard.auth().status();
  assert!(status.logged_in);
  assert!(status.has_access_token);
  assert!(status.has_refresh_token);
}

#[tokio::test]
async fn test_bad_credentials_do_not_trigger_refresh() {
  let h = harness().await;
  let dashboard = uncached(&h);

  Mock::given(method("POST"))
    .and(path(api("/auth/login")))
    .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
    .expect(1)
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/auth/refresh")))
    .respond_with(ResponseTemplate::new(200))
    .expect(0)
    .mount(&h.server)
    .await;

  let result = dashboard
    .auth()
    .login("admin@example.org", "wrong", &CancellationToken::new())
    .await;

  assert!(matches!(result, Err(e) if e.is_unauthorized()));
  assert!(h.notifier.drain().is_empty());
  assert!(!dashboard.auth().status().logged_in);
}

#[tokio::test]
async fn test_logout_clears_session_even_if_backend_fails() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("POST"))
    .and(path(api("/auth/logout")))
    .and(header("authorization", "Bearer access-1"))
    .respond_with(ResponseTemplate::new(500))
    .expect(1)
    .mount(&h.server)
    .await;

  dashboard
    .auth()
    .logout(&CancellationToken::new())
    .await
    .unwrap();

  let status = dashboard.auth().status();
  assert!(!status.logged_in);
  assert!(!status.has_access_token);
  assert!(h.notifier.drain().is_empty());
}

#[tokio::test]
async fn test_finance_summary() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/finance/summary")))
    .and(query_param("from", "2024-01-01"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": {"totalIncome": "1500.50", "totalExpense": 500, "balance": 1000.5, "currency": "EUR"}
    })))
    .expect(1)
    .mount(&h.server)
    .await;

  let period = SummaryPeriod {
    from: Some("2024-01-01".to_string()),
    to: None,
  };
  let summary = dashboard
    .finance()
    .summary(&period, &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.total_income, 1500.5);
  assert_eq!(summary.total_expense, 500.0);
  assert_eq!(summary.balance, 1000.5);
  assert_eq!(summary.extra.get("currency"), Some(&json!("EUR")));
}

#[tokio::test]
async fn test_finance_transactions_list() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("GET"))
    .and(path(api("/finance/transactions")))
    .and(query_param("type", "expense"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": [{"id": 1, "type": "expense", "amount": "19.99", "category": "supplies"}],
      "meta": {"page": 1, "limit": 10, "total_pages": 1, "total_count": 1}
    })))
    .mount(&h.server)
    .await;

  let page = dashboard
    .finance()
    .transactions()
    .list(
      &ListParams::default().filter("type", "expense"),
      &CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(page.data.len(), 1);
  assert_eq!(page.data[0].amount, 19.99);
  assert_eq!(page.meta.total_count, Some(1));
}

#[tokio::test]
async fn test_upload_sends_multipart() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("POST"))
    .and(path(api("/uploads")))
    .and(header_regex("content-type", "^multipart/form-data; boundary="))
    .and(body_string_contains("filename=\"report.pdf\""))
    .and(body_string_contains("name=\"folder\""))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({
      "data": {"fileUrl": "https://cdn.example.org/report.pdf", "originalName": "report.pdf", "size": 8}
    })))
    .expect(1)
    .mount(&h.server)
    .await;

  let file = UploadFile::new(b"%PDF-1.4".to_vec(), "report.pdf");
  assert_eq!(file.mime, "application/pdf");

  let uploaded = dashboard
    .uploads()
    .upload(file, Some("minutes"), &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(uploaded.url, "https://cdn.example.org/report.pdf");
  assert_eq!(uploaded.file_name.as_deref(), Some("report.pdf"));
  assert_eq!(uploaded.size, Some(8));
}

#[tokio::test]
async fn test_upload_is_retried_with_fresh_form() {
  let h = logged_in().await;
  let dashboard = uncached(&h);

  Mock::given(method("POST"))
    .and(path(api("/uploads")))
    .respond_with(ResponseTemplate::new(503))
    .up_to_n_times(1)
    .mount(&h.server)
    .await;
  Mock::given(method("POST"))
    .and(path(api("/uploads")))
    .and(body_string_contains("%PDF-1.4"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "https://cdn.example.org/a.pdf"})))
    .expect(1)
    .mount(&h.server)
    .await;

  let uploaded = dashboard
    .uploads()
    .upload(
      UploadFile::new(b"%PDF-1.4".to_vec(), "a.pdf"),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();
  assert_eq!(uploaded.url, "https://cdn.example.org/a.pdf");
}
