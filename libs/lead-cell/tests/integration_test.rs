use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lead_cell::router::lead_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    lead_routes(Arc::new(config))
}

fn test_config(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

fn admin_token(config: &AppConfig) -> String {
    let admin = TestUser::admin("staff@example.com");
    JwtTestUtils::create_test_token(&admin, &config.supabase_jwt_secret, Some(24))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_submit_quote_success() {
    let mock_server = MockServer::start().await;

    let quote_id = Uuid::new_v4().to_string();
    Mock::given(method("POST"))
        .and(path("/rest/v1/quote_requests"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::quote_request_response(&quote_id, "jean@example.com", &["website"])
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));

    let request_body = json!({
        "name": "Jean Dupont",
        "email": "jean@example.com",
        "services": ["website"],
        "project_details": "Site vitrine",
        "consent_given": true,
    });

    let request = Request::builder()
        .method("POST")
        .uri("/quotes")
        .header("Content-Type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["quote"]["email"], json!("jean@example.com"));
}

#[tokio::test]
async fn test_submit_quote_requires_consent_and_services() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(test_config(&mock_server));

    let no_consent = json!({
        "name": "Jean Dupont",
        "email": "jean@example.com",
        "services": ["website"],
        "consent_given": false,
    });

    let request = Request::builder()
        .method("POST")
        .uri("/quotes")
        .header("Content-Type", "application/json")
        .body(Body::from(no_consent.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let no_services = json!({
        "name": "Jean Dupont",
        "email": "jean@example.com",
        "services": [],
        "consent_given": true,
    });

    let request = Request::builder()
        .method("POST")
        .uri("/quotes")
        .header("Content-Type", "application/json")
        .body(Body::from(no_services.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_quotes_requires_admin() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(config.clone());

    let request = Request::builder()
        .method("GET")
        .uri("/manage/quotes")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let visitor = TestUser::visitor("visitor@example.com");
    let token = JwtTestUtils::create_test_token(&visitor, &config.supabase_jwt_secret, Some(24));

    let request = Request::builder()
        .method("GET")
        .uri("/manage/quotes")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_quotes_with_status_filter() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let quote_id = Uuid::new_v4().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/quote_requests"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::quote_request_response(&quote_id, "jean@example.com", &["website"])
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.clone());
    let token = admin_token(&config);

    let request = Request::builder()
        .method("GET")
        .uri("/manage/quotes?status=pending")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], json!(1));
}

#[tokio::test]
async fn test_quote_status_lifecycle_is_enforced() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let quote_id = Uuid::new_v4();
    let mut quote =
        MockSupabaseResponses::quote_request_response(&quote_id.to_string(), "jean@example.com", &["website"]);
    quote["status"] = json!("completed");

    Mock::given(method("GET"))
        .and(path("/rest/v1/quote_requests"))
        .and(query_param("id", format!("eq.{}", quote_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([quote])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.clone());
    let token = admin_token(&config);

    // completed -> pending is not a legal transition
    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/manage/quotes/{}/status", quote_id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"status": "pending"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quote_sections_follow_declared_services() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let quote_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/quote_requests"))
        .and(query_param("id", format!("eq.{}", quote_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::quote_request_response(
                &quote_id.to_string(),
                "jean@example.com",
                &["website", "automation"]
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.clone());
    let token = admin_token(&config);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/manage/quotes/{}/sections", quote_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let sections: Vec<String> = body["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();

    assert!(sections.contains(&"website".to_string()));
    assert!(sections.contains(&"automation".to_string()));
    assert!(!sections.contains(&"mobile_app".to_string()));
    assert!(!sections.contains(&"ecommerce".to_string()));
}

#[tokio::test]
async fn test_delete_quote_cleans_up_orphaned_client() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let quote_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/quote_requests"))
        .and(query_param("id", format!("eq.{}", quote_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::quote_request_response(
                &quote_id.to_string(),
                "jean@example.com",
                &["website"]
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/quote_requests"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    // No remaining interactions for this email
    Mock::given(method("GET"))
        .and(path("/rest/v1/quote_requests"))
        .and(query_param("email", "eq.jean@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/call_bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let delete_client = Mock::given(method("DELETE"))
        .and(path("/rest/v1/client_statuses"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1);
    delete_client.mount(&mock_server).await;

    let app = create_test_app(config.clone());
    let token = admin_token(&config);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/manage/quotes/{}", quote_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_set_client_stage_upserts() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    Mock::given(method("POST"))
        .and(path("/rest/v1/client_statuses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "client_email": "jean@example.com",
            "status": "prospect",
            "notes": null,
            "updated_at": "2026-08-07T10:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.clone());
    let token = admin_token(&config);

    let request = Request::builder()
        .method("PUT")
        .uri("/manage/clients/jean@example.com")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"status": "prospect"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["client"]["status"], json!("prospect"));
}

#[tokio::test]
async fn test_call_notes_roundtrip() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let booking_id = Uuid::new_v4();
    let notes_id = Uuid::new_v4();

    // Nothing saved yet
    Mock::given(method("GET"))
        .and(path("/rest/v1/call_booking_notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/call_booking_notes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": notes_id,
            "call_booking_id": booking_id,
            "call_summary": "Discussed the rebuild of their storefront",
            "follow_up_actions": "Send a Business tier proposal",
            "call_outcome": "interested",
            "callback_date": null,
            "internal_notes": null
        }])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.clone());
    let token = admin_token(&config);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/manage/call-notes/{}", booking_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["exists"], json!(false));

    let save_body = json!({
        "call_booking_id": booking_id,
        "call_summary": "Discussed the rebuild of their storefront",
        "follow_up_actions": "Send a Business tier proposal",
        "call_outcome": "interested",
        "callback_date": null,
        "internal_notes": null,
    });

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/manage/call-notes/{}", booking_id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(save_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["notes"]["call_outcome"], json!("interested"));
}

#[tokio::test]
async fn test_draft_session_opens_and_closes() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let app = create_test_app(config.clone());
    let token = admin_token(&config);
    let booking_id = Uuid::new_v4();

    let draft_body = json!({
        "call_booking_id": booking_id,
        "call_summary": "wip",
        "follow_up_actions": null,
        "call_outcome": null,
        "callback_date": null,
        "internal_notes": null,
    });

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/manage/call-notes/{}/draft", booking_id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(draft_body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Closing the view cancels the autosave task
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/manage/call-notes/{}/draft", booking_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["closed"], json!(true));

    // A second close is a no-op
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/manage/call-notes/{}/draft", booking_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["closed"], json!(false));
}
