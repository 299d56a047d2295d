use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use yatra_api::middleware::{issue_token, Role};
use yatra_api::{app, metrics::Metrics, AppState, Stores};
use yatra_booking::EngineConfig;
use yatra_catalog::PricingConfig;
use yatra_core::{InMemoryStore, MemoryNotifier, MockPaymentGateway};
use yatra_schedule::GeneratorConfig;
use yatra_store::app_config::{
    AuthConfig, DatabaseConfig, KafkaConfig, RedisConfig, SchedulerConfig, ServerConfig,
};
use yatra_store::{Config, StorageBackend};

const SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        server: ServerConfig { port: 0 },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            backend: StorageBackend::Memory,
        },
        redis: RedisConfig::default(),
        kafka: KafkaConfig::default(),
        auth: AuthConfig { jwt_secret: SECRET.to_string() },
        booking: EngineConfig::default(),
        generator: GeneratorConfig::default(),
        pricing: PricingConfig::default(),
        scheduler: SchedulerConfig::default(),
    }
}

fn test_app() -> Router {
    let store = Arc::new(InMemoryStore::new());
    let stores = Stores {
        trips: store.clone(),
        bookings: store.clone(),
        payments: store,
    };
    let state = AppState::build(
        &test_config(),
        stores,
        Arc::new(MockPaymentGateway),
        Arc::new(MemoryNotifier::new()),
        Arc::new(Metrics::new().unwrap()),
    );
    app(state)
}

fn token(sub: &str, role: Role) -> String {
    issue_token(SECRET, sub, role, 3600).unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header("Authorization", format!("Bearer {}", t));
    }
    let request = match body {
        Some(b) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn trip_body(seats: i32) -> Value {
    let departure = Utc::now() + Duration::days(5);
    json!({
        "route_id": "delhi-vrindavan",
        "destination_id": "prem-mandir",
        "title": "Vrindavan Weekend",
        "description": null,
        "departure_at": departure,
        "return_at": departure + Duration::days(2),
        "departure_clock": "06:00 AM",
        "return_clock": "10:00 PM",
        "total_seats": seats,
        "price_per_seat": 1500,
        "advance_price": 400
    })
}

fn passengers(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| json!({ "name": format!("Yatri {}", i + 1), "age": 40, "gender": "MALE" }))
            .collect(),
    )
}

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "memory");
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = test_app();
    let admin = token("ops-1", Role::Admin);
    let customer = token("user-1", Role::Customer);
    let stranger = token("user-2", Role::Customer);

    let (status, trip) = call(&app, "POST", "/v1/admin/trips", Some(&admin), Some(trip_body(10))).await;
    assert_eq!(status, StatusCode::CREATED);
    let trip_id = trip["id"].as_str().unwrap().to_string();

    let (status, booking) = call(
        &app,
        "POST",
        "/v1/bookings",
        Some(&customer),
        Some(json!({ "trip_id": trip_id, "passengers": passengers(3), "advance_amount": 1200, "payment_method": "UPI" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["total_amount"], 4500);
    assert_eq!(booking["payment_status"], "ADVANCE_PAID");
    assert!(booking["booking_number"].as_str().unwrap().starts_with("WKD-"));
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (_, trip) = call(&app, "GET", &format!("/v1/trips/{}", trip_id), None, None).await;
    assert_eq!(trip["available_seats"], 7);

    let (status, _) = call(&app, "GET", &format!("/v1/bookings/{}", booking_id), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, mine) = call(&app, "GET", "/v1/bookings/me", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, history) =
        call(&app, "GET", &format!("/v1/bookings/{}/payments", booking_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["kind"], "ADVANCE");

    let (status, cancelled) =
        call(&app, "POST", &format!("/v1/bookings/{}/cancel", booking_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["booking_status"], "CANCELLED");
    assert_eq!(cancelled["payment_status"], "REFUNDED");

    let (status, _) =
        call(&app, "POST", &format!("/v1/bookings/{}/cancel", booking_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, trip) = call(&app, "GET", &format!("/v1/trips/{}", trip_id), None, None).await;
    assert_eq!(trip["available_seats"], 10);
}

#[tokio::test]
async fn test_overbooking_is_refused_and_counted() {
    let app = test_app();
    let admin = token("ops-1", Role::Admin);
    let customer = token("user-1", Role::Customer);

    let (_, trip) = call(&app, "POST", "/v1/admin/trips", Some(&admin), Some(trip_body(2))).await;
    let (status, body) = call(
        &app,
        "POST",
        "/v1/bookings",
        Some(&customer),
        Some(json!({ "trip_id": trip["id"], "passengers": passengers(3) })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Insufficient seats"));

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("yatra_bookings_rejected_total{reason=\"insufficient_seats\"} 1"));
}

#[tokio::test]
async fn test_admin_routes_require_operator_role() {
    let app = test_app();

    let (status, _) = call(&app, "POST", "/v1/admin/trips/regenerate", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = token("user-1", Role::Customer);
    let (status, _) = call(&app, "POST", "/v1/admin/trips/regenerate", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "GET", "/v1/bookings/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_regenerate_publishes_bookable_weekends() {
    let app = test_app();
    let admin = token("ops-1", Role::SuperAdmin);

    let (status, summary) = call(&app, "POST", "/v1/admin/trips/regenerate", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let created = summary["trips_created"].as_u64().unwrap();
    assert!(created > 0);

    let (status, trips) = call(&app, "GET", "/v1/trips?tour_type=ayodhya", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let trips = trips.as_array().unwrap();
    assert!(!trips.is_empty());
    assert!(trips.iter().all(|t| t["tour_type"] == "ayodhya"));

    let (status, again) = call(&app, "POST", "/v1/admin/trips/regenerate", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["trips_created"], 0);
}

#[tokio::test]
async fn test_only_operators_confirm_full_payment() {
    let app = test_app();
    let admin = token("ops-1", Role::Admin);
    let customer = token("user-1", Role::Customer);

    let (_, trip) = call(&app, "POST", "/v1/admin/trips", Some(&admin), Some(trip_body(6))).await;
    let (status, booking) = call(
        &app,
        "POST",
        "/v1/bookings",
        Some(&customer),
        Some(json!({ "trip_id": trip["id"], "passengers": passengers(2), "advance_amount": 800 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let confirm = format!("/v1/bookings/{}/confirm-payment", booking["id"].as_str().unwrap());

    let (status, _) = call(&app, "POST", &confirm, Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, unchanged) =
        call(&app, "GET", &format!("/v1/bookings/{}", booking["id"].as_str().unwrap()), Some(&customer), None).await;
    assert_eq!(unchanged["payment_status"], "ADVANCE_PAID");

    let (status, paid) = call(&app, "POST", &confirm, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment_status"], "FULL_PAID");
}

#[tokio::test]
async fn test_trip_seats_cannot_be_edited_directly() {
    let app = test_app();
    let admin = token("ops-1", Role::Admin);

    let (_, trip) = call(&app, "POST", "/v1/admin/trips", Some(&admin), Some(trip_body(4))).await;
    let (status, _) = call(
        &app,
        "POST",
        &format!("/v1/admin/trips/{}/seats", trip["id"].as_str().unwrap()),
        Some(&admin),
        Some(json!({ "delta": 2147483647 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, trip) = call(&app, "GET", &format!("/v1/trips/{}", trip["id"].as_str().unwrap()), None, None).await;
    assert_eq!(trip["available_seats"], 4);
}
