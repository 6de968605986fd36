use std::time::Duration;

use reqwest::{Method, StatusCode};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::errors::{Error, ErrorClass};
use crate::tests::test_support::{Pet, capture_logs, drain_logs, harness, pet_json};

#[derive(Debug, serde::Deserialize)]
struct Booking {
    id: String,
}

#[tokio::test]
async fn booking_succeeds_after_three_backoffs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "b-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let (lines, guard) = capture_logs();
    let request = h
        .client
        .request(Method::POST, "/bookings")
        .retries(3)
        .retry_delay(Duration::from_millis(100))
        .json(&serde_json::json!({ "petId": "42", "slot": "2026-10-20T10:00:00Z" }))
        .unwrap();
    let booking: Booking = h.client.execute(&request).await.expect("booking created");
    drop(guard);

    assert_eq!(booking.id, "b-1");
    assert_eq!(
        h.sleeper.delays(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
        ]
    );

    let logs = drain_logs(lines);
    let scheduled = logs
        .iter()
        .filter(|line| line.contains("retry.scheduling"))
        .count();
    assert_eq!(scheduled, 3, "one retry.scheduling per backoff: {:?}", logs);
    assert!(
        logs.iter()
            .any(|line| line.contains("retry.outcome") && line.contains("attempts=4")),
        "expected outcome with 4 attempts, got {:?}",
        logs
    );
}

#[tokio::test]
async fn zero_retries_fails_on_first_503() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let request = h.client.request(Method::POST, "/bookings").retries(0);
    let err = h
        .client
        .execute::<Booking>(&request)
        .await
        .expect_err("no retries configured");

    match &err {
        Error::Http { status, body } => {
            assert_eq!(*status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.class(), ErrorClass::TransientServer);
    assert!(h.sleeper.delays().is_empty());
}

#[tokio::test]
async fn exhausted_retries_surface_last_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/current"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(&server);
    let request = h
        .client
        .request(Method::GET, "/subscriptions/current")
        .retries(2);
    let err = h
        .client
        .execute::<serde_json::Value>(&request)
        .await
        .expect_err("exhausted");

    assert_eq!(err.http_status(), Some(502));
    assert_eq!(err.message(), "HTTP 502");
    assert_eq!(h.sleeper.delays().len(), 2);
}

#[tokio::test]
async fn internal_server_error_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/community/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("{\"error\":\"boom\"}"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let request = h.client.request(Method::GET, "/community/posts");
    let err = h
        .client
        .execute::<serde_json::Value>(&request)
        .await
        .expect_err("500 is terminal");

    assert_eq!(err.class(), ErrorClass::TerminalServer);
    assert_eq!(err.user_message(), "boom");
    assert!(h.sleeper.delays().is_empty());
}

#[tokio::test]
async fn decode_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let request = h.client.request(Method::GET, "/pets/42");
    let err = h
        .client
        .execute::<Pet>(&request)
        .await
        .expect_err("shape mismatch");

    match err {
        Error::Decode { status, .. } => assert_eq!(status, StatusCode::OK),
        other => panic!("expected decode failure, got {:?}", other),
    }
    assert!(h.sleeper.delays().is_empty());
}

#[tokio::test]
async fn refresh_replay_shares_the_attempt_counter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pets/42"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "new-access",
            "refreshToken": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/42"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/42"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pet_json("42")))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let request = h.client.request(Method::GET, "/pets/42").retries(2);
    let pet: Pet = h.client.execute(&request).await.expect("pet after refresh and retry");

    assert_eq!(pet.id, "42");
    // The replay counted as the first retry, so the backoff is the second step.
    assert_eq!(h.sleeper.delays(), vec![Duration::from_millis(200)]);
}

#[tokio::test]
async fn refresh_replay_can_exhaust_the_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pets/42"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "new-access",
            "refreshToken": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/42"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let request = h.client.request(Method::GET, "/pets/42").retries(1);
    let err = h
        .client
        .execute::<Pet>(&request)
        .await
        .expect_err("budget spent on the replay");

    assert_eq!(err.class(), ErrorClass::TransientServer);
    assert!(h.sleeper.delays().is_empty());
}
