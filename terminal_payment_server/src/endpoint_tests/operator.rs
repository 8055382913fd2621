use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use crate::{
    data_objects::PollSummaryResponse,
    endpoint_tests::helpers::{prepare_test_db, send_request, with_operator_key},
};

#[actix_web::test]
async fn operator_routes_require_the_operator_key() {
    let db = prepare_test_db().await;

    let (status, _) = send_request(&db, TestRequest::post().uri("/poll")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post().uri("/poll").insert_header(("Authorization", "Bearer wrong-key"));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post()
        .uri("/admin/merchants")
        .set_json(json!({ "name": "Sneaky", "access_token": "APP_USR-x" }));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn manual_poll_on_an_empty_database_reports_an_empty_pass() {
    let db = prepare_test_db().await;
    // No merchants on file, so the pass completes without talking to the provider.
    let (status, body) = send_request(&db, with_operator_key(TestRequest::post().uri("/poll"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let summary: PollSummaryResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(summary.merchants_polled, 0);
    assert_eq!(summary.merchants_failed, 0);
    assert_eq!(summary.new_payments, 0);
}

#[actix_web::test]
async fn rotating_an_unknown_merchant_is_a_404() {
    let db = prepare_test_db().await;
    let req = with_operator_key(TestRequest::post().uri("/admin/merchants/9999/token"))
        .set_json(json!({ "access_token": "APP_USR-new" }));
    let (status, _) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
