use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use terminal_payment_engine::BLOCKED_DEVICE_MESSAGE;

use crate::{
    data_objects::{DeviceStatusResponse, RegisterDeviceResponse},
    endpoint_tests::helpers::{prepare_test_db, send_request, with_device_key, with_operator_key},
};

#[actix_web::test]
async fn health_is_open() {
    let db = prepare_test_db().await;
    let (status, body) = send_request(&db, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn full_device_flow() {
    let db = prepare_test_db().await;

    // Operator seeds a merchant with an activation code.
    let req = with_operator_key(TestRequest::post().uri("/admin/merchants")).set_json(json!({
        "name": "Cafe Central",
        "access_token": "APP_USR-cafe",
        "activation_code": "CAFE-2024",
    }));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    // The terminal registers with the code and receives its one-time API key.
    let req = TestRequest::post()
        .uri("/register")
        .set_json(json!({ "serial": "POS-001", "activation_code": "CAFE-2024" }));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let registered: RegisterDeviceResponse = serde_json::from_str(&body).unwrap();
    assert!(!registered.api_key.is_empty());

    let (status, body) =
        send_request(&db, with_device_key(TestRequest::get().uri("/status"), &registered.api_key, "POS-001")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let device_status: DeviceStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(device_status.serial, "POS-001");
    assert_eq!(device_status.status, "Active");
    assert!(device_status.message.is_none());
    assert!(device_status.last_seen.is_some());

    let (status, body) =
        send_request(&db, with_device_key(TestRequest::get().uri("/payments"), &registered.api_key, "POS-001")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let payments: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payments, json!([]));

    let (status, body) =
        send_request(&db, with_device_key(TestRequest::post().uri("/heartbeat"), &registered.api_key, "POS-001"))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Older firmware sends the serial hint as a query parameter instead of the header.
    let req = TestRequest::get()
        .uri("/payments?serial=POS-001&limit=5")
        .insert_header(("Authorization", format!("Bearer {}", registered.api_key)));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn device_routes_reject_missing_or_bad_credentials() {
    let db = prepare_test_db().await;

    let (status, _) = send_request(&db, TestRequest::get().uri("/payments")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = with_device_key(TestRequest::get().uri("/payments"), "not-a-real-key", "POS-404");
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn registration_requires_exactly_one_binding() {
    let db = prepare_test_db().await;

    let req = TestRequest::post().uri("/register").set_json(json!({ "serial": "POS-X" }));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post().uri("/register").set_json(json!({
        "serial": "POS-X",
        "activation_code": "CODE",
        "access_token": "APP_USR-token",
    }));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri("/register")
        .set_json(json!({ "serial": "POS-X", "activation_code": "NO-SUCH-CODE" }));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn notification_push_lands_in_the_payment_feed() {
    let db = prepare_test_db().await;

    let req = TestRequest::post()
        .uri("/register")
        .set_json(json!({ "serial": "POS-NTF", "access_token": "APP_USR-ntf" }));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let registered: RegisterDeviceResponse = serde_json::from_str(&body).unwrap();

    // The terminal saw a payment locally and pushes it ahead of the provider poll.
    let req = with_device_key(TestRequest::post().uri("/notify"), &registered.api_key, "POS-NTF")
        .set_json(json!({ "amount": 42.5, "payer_name": "Ana" }));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let pushed: Value = serde_json::from_str(&body).unwrap();
    let pushed_id = pushed["id"].as_str().unwrap().to_string();
    assert!(pushed_id.starts_with("local_"));
    assert_eq!(pushed["status"], "notified");
    assert_eq!(pushed["amount"], 42.5);

    let (status, body) =
        send_request(&db, with_device_key(TestRequest::get().uri("/payments"), &registered.api_key, "POS-NTF")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let payments: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert_eq!(payments[0]["id"], pushed_id.as_str());

    // Zero and negative amounts are rejected before anything is stored.
    let req = with_device_key(TestRequest::post().uri("/notify"), &registered.api_key, "POS-NTF")
        .set_json(json!({ "amount": -5.0 }));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post().uri("/notify").set_json(json!({ "amount": 10.0 }));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn blocked_devices_get_the_standard_message() {
    let db = prepare_test_db().await;

    let req = TestRequest::post()
        .uri("/register")
        .set_json(json!({ "serial": "POS-BLK", "access_token": "APP_USR-blk" }));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let registered: RegisterDeviceResponse = serde_json::from_str(&body).unwrap();

    let uri = format!("/admin/devices/{}/block", registered.device_id);
    let (status, body) = send_request(&db, with_operator_key(TestRequest::post().uri(&uri))).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // The payments feed is closed with the exact scripted message.
    let (status, body) =
        send_request(&db, with_device_key(TestRequest::get().uri("/payments"), &registered.api_key, "POS-BLK")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let error: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["error"], BLOCKED_DEVICE_MESSAGE);

    // Status still works; it carries the same message so the terminal can display it.
    let (status, body) =
        send_request(&db, with_device_key(TestRequest::get().uri("/status"), &registered.api_key, "POS-BLK")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let device_status: DeviceStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(device_status.status, "Blocked");
    assert_eq!(device_status.message.as_deref(), Some(BLOCKED_DEVICE_MESSAGE));

    let uri = format!("/admin/devices/{}/unblock", registered.device_id);
    let (status, body) = send_request(&db, with_operator_key(TestRequest::post().uri(&uri))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) =
        send_request(&db, with_device_key(TestRequest::get().uri("/payments"), &registered.api_key, "POS-BLK")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}
