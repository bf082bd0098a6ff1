use std::sync::Arc;

use axum::body::{to_bytes, Body};
use http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use patient_cell::router::patient_routes;
use shared_storage::MemoryStore;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn profile_round_trip_through_router() {
    let config = TestConfig::default();
    let state = config.to_state(Arc::new(MemoryStore::new()));
    let user = TestUser::patient("ana@example.com");
    let auth = JwtTestUtils::auth_header(&user, &config.jwt_secret);

    let app = patient_routes(state);

    let put = Request::builder()
        .method("PUT")
        .uri("/patients/me")
        .header(header::AUTHORIZATION, &auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "name": "Ana", "lastname": "Diaz", "email": "ana@example.com",
                "phone": "+54 11 5555-0001", "insurance": "OSDE",
                "dni": "30123456", "gender": "F"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(put).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let get = Request::builder()
        .uri("/patients/me")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["complete"], json!(true));
    assert_eq!(body["profile"]["name"], json!("Ana"));
    assert_eq!(body["missingFields"], json!([]));
}

#[tokio::test]
async fn profile_requires_authentication() {
    let state = TestConfig::default().to_state(Arc::new(MemoryStore::new()));
    let app = patient_routes(state);

    let response = app
        .oneshot(Request::builder().uri("/patients/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn incomplete_profile_lists_missing_fields() {
    let config = TestConfig::default();
    let state = config.to_state(Arc::new(MemoryStore::new()));
    let user = TestUser::patient("luis@example.com");
    let auth = JwtTestUtils::auth_header(&user, &config.jwt_secret);

    let app = patient_routes(state);
    let put = Request::builder()
        .method("PUT")
        .uri("/patients/me")
        .header(header::AUTHORIZATION, &auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"name": "Luis"}).to_string()))
        .unwrap();
    let response = app.oneshot(put).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["complete"], json!(false));
    let missing: Vec<String> =
        serde_json::from_value(body["missingFields"].clone()).unwrap();
    assert!(missing.contains(&"lastname".to_string()));
    assert!(!missing.contains(&"name".to_string()));
}
