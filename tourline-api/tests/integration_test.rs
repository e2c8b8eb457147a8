use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tourline_api::state::{Backends, Settings};
use tourline_api::{app, AppState};
use tourline_booking::memory::{InMemoryBookingRepository, InMemoryHoldLedger, InMemoryReviewRepository, OutboxNotifier};
use tourline_catalog::{InMemoryCatalogStore, LocalCatalog};
use tourline_core::catalog::TourInfo;
use tourline_core::reviews::{ReviewTokenIssuing, ReviewTokenRequest};
use tourline_core::CoreResult;

struct TestApp {
    router: Router,
    outbox: Arc<OutboxNotifier>,
    tour_id: Uuid,
}

async fn test_app() -> TestApp {
    test_app_with(None).await
}

async fn test_app_with(issuer: Option<Arc<dyn ReviewTokenIssuing>>) -> TestApp {
    let store = InMemoryCatalogStore::new();
    let tour_id = Uuid::new_v4();
    store
        .put_tour(TourInfo {
            id: tour_id,
            title: "Atlas Foothills Trek".to_string(),
            base_price: dec!(50.00),
            duration_days: 2,
            max_participants: 10,
            min_participants: 1,
            group_discount_threshold: 5,
            group_discount_percentage: dec!(0),
        })
        .await;

    let outbox = Arc::new(OutboxNotifier::new());
    let state = AppState::assemble(
        Backends {
            catalog: Arc::new(LocalCatalog::new(Arc::new(store))),
            bookings: Arc::new(InMemoryBookingRepository::new()),
            reviews: Arc::new(InMemoryReviewRepository::new()),
            holds: Arc::new(InMemoryHoldLedger::new()),
            notifications: outbox.clone(),
            issuer,
        },
        Settings::default(),
    );
    TestApp { router: app(state), outbox, tour_id }
}

fn future(days: i64) -> String {
    (Utc::now().date_naive() + chrono::Duration::days(days)).to_string()
}

fn decimal(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).unwrap()
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn booking_body(tour_id: Uuid, participants: u32) -> Value {
    json!({
        "tour_id": tour_id.to_string(),
        "customer_name": "Amira Benali",
        "email": "amira@example.com",
        "phone": "+212 600 000 000",
        "start_date": future(30),
        "end_date": future(31),
        "number_of_participants": participants,
    })
}

#[tokio::test]
async fn test_booking_to_review_flow() {
    let t = test_app().await;

    let (status, quote) = call(
        &t.router,
        Method::POST,
        "/bookings/calculate-price",
        Some(json!({
            "tour_id": t.tour_id.to_string(),
            "start_date": future(30),
            "end_date": future(31),
            "number_of_participants": 4,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&quote["total_price"]), dec!(400));

    let (status, booking) = call(&t.router, Method::POST, "/bookings", Some(booking_body(t.tour_id, 4))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "pending");
    assert_eq!(decimal(&booking["price_per_person"]), dec!(50.00));
    assert_eq!(decimal(&booking["total_price"]), dec!(400.00));
    let id = booking["id"].as_str().unwrap().to_string();

    let (status, confirmed) = call(
        &t.router,
        Method::PUT,
        &format!("/bookings/{}", id),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, completed) = call(&t.router, Method::POST, &format!("/bookings/{}/complete", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["email_sent"], true);
    let token = completed["review_token"].as_str().unwrap().to_string();

    let (status, _) = call(&t.router, Method::POST, &format!("/bookings/{}/complete", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Issuing again for the same booking hands back the existing token.
    let (status, reissued) = call(
        &t.router,
        Method::POST,
        "/reviews/create-token",
        Some(json!({
            "booking_id": id,
            "tour_id": t.tour_id.to_string(),
            "customer_name": "Amira Benali",
            "customer_email": "amira@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reissued["token"], token.as_str());

    let (status, form) = call(&t.router, Method::GET, &format!("/reviews/form/{}", token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["tour_title"], "Atlas Foothills Trek");
    assert_eq!(form["already_submitted"], false);

    let (status, submitted) = call(
        &t.router,
        Method::POST,
        &format!("/reviews/submit/{}", token),
        Some(json!({ "rating": 5, "review_text": "Wonderful guides", "customer_name": "Amira" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["review"]["rating"], 5);

    let (status, reviews) = call(&t.router, Method::GET, &format!("/tours/{}/reviews", t.tour_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews.as_array().unwrap().len(), 1);

    let (_, stats) = call(&t.router, Method::GET, &format!("/tours/{}/rating-stats", t.tour_id), None).await;
    assert_eq!(stats["total_reviews"], 1);

    let templates: Vec<String> = t.outbox.sent().await.into_iter().map(|n| n.template).collect();
    assert!(templates.iter().any(|name| name == "booking_confirmation"));
    assert!(templates.iter().any(|name| name == "review_request"));
}

#[tokio::test]
async fn test_complete_requires_confirmed() {
    let t = test_app().await;
    let (_, booking) = call(&t.router, Method::POST, "/bookings", Some(booking_body(t.tour_id, 2))).await;
    let id = booking["id"].as_str().unwrap();

    let (status, body) = call(&t.router, Method::POST, &format!("/bookings/{}/complete", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_holds_block_overbooking() {
    let t = test_app().await;
    let (status, _) = call(&t.router, Method::POST, "/bookings", Some(booking_body(t.tour_id, 8))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&t.router, Method::POST, "/bookings", Some(booking_body(t.tour_id, 4))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Not available"));

    let uri = format!(
        "/tours/{}/availability?start_date={}&end_date={}&participants=2",
        t.tour_id,
        future(30),
        future(31)
    );
    let (status, report) = call(&t.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["available"], true);
}

#[tokio::test]
async fn test_error_statuses() {
    let t = test_app().await;

    let (status, body) = call(&t.router, Method::GET, "/reviews/form/not-a-token", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = call(&t.router, Method::GET, "/bookings/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&t.router, Method::GET, &format!("/bookings/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut past = booking_body(t.tour_id, 2);
    past["start_date"] = json!("2020-01-01");
    past["end_date"] = json!("2020-01-02");
    let (status, _) = call(&t.router, Method::POST, "/bookings", Some(past)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut garbled = booking_body(t.tour_id, 2);
    garbled["start_date"] = json!("01/02/2030");
    let (status, _) = call(&t.router, Method::POST, "/bookings", Some(garbled)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mark_viewed_and_list() {
    let t = test_app().await;
    let (_, booking) = call(&t.router, Method::POST, "/bookings", Some(booking_body(t.tour_id, 2))).await;
    let id = booking["id"].as_str().unwrap();

    let (status, body) = call(&t.router, Method::PATCH, &format!("/bookings/{}/mark-viewed", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Booking marked as viewed");

    let (status, list) = call(&t.router, Method::GET, "/bookings?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["admin_viewed"], true);
}

#[tokio::test]
async fn test_health_reports_collaborators() {
    let t = test_app().await;
    let (status, body) = call(&t.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "booking-service");
    assert!(body["dependencies"]["tours_service"].is_string());
}

async fn confirmed_booking(t: &TestApp) -> String {
    let (_, booking) = call(&t.router, Method::POST, "/bookings", Some(booking_body(t.tour_id, 2))).await;
    let id = booking["id"].as_str().unwrap().to_string();
    let (status, _) = call(
        &t.router,
        Method::PUT,
        &format!("/bookings/{}", id),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    id
}

#[tokio::test]
async fn test_complete_reports_unsent_review_email() {
    let t = test_app().await;
    let id = confirmed_booking(&t).await;
    t.outbox.set_failing(true);

    let (status, body) = call(&t.router, Method::POST, &format!("/bookings/{}/complete", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["email_sent"], false);
    assert_eq!(body["message"], "Booking completed but failed to send review request email");
    assert!(body["review_token"].is_string());
}

struct ToursServiceIssuer;

#[async_trait]
impl ReviewTokenIssuing for ToursServiceIssuer {
    async fn issue_token(&self, request: &ReviewTokenRequest) -> CoreResult<String> {
        Ok(format!("tours-{}", request.booking_id.simple()))
    }
}

#[tokio::test]
async fn test_upstream_issued_token_accepted_here() {
    let t = test_app_with(Some(Arc::new(ToursServiceIssuer))).await;
    let id = confirmed_booking(&t).await;

    let (status, completed) = call(&t.router, Method::POST, &format!("/bookings/{}/complete", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let token = completed["review_token"].as_str().unwrap().to_string();
    assert!(token.starts_with("tours-"));

    let (status, form) = call(&t.router, Method::GET, &format!("/reviews/form/{}", token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["booking_id"], id.as_str());

    let (status, submitted) = call(
        &t.router,
        Method::POST,
        &format!("/reviews/submit/{}", token),
        Some(json!({ "rating": 4, "customer_name": "Amira" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["message"], "Review submitted successfully");
}
