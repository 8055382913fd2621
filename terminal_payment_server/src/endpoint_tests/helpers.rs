use actix_web::{
    body,
    http::StatusCode,
    middleware::Logger,
    test,
    test::TestRequest,
    web,
    App,
};
use mercado_tools::{MercadoApi, MercadoConfig};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use terminal_payment_engine::{vault::Vault, DeviceApi, IngestApi, IngestOptions, SqliteDatabase};
use tps_common::Secret;

use crate::{
    config::ServerOptions,
    integrations::mercado::MercadoFeed,
    routes::{
        block_device,
        create_merchant,
        health,
        heartbeat,
        notify,
        payments,
        poll_now,
        register,
        rotate_merchant_token,
        status,
        unblock_device,
    },
};

// Test-only vault key. DO NOT re-use anywhere.
const TEST_VAULT_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const OPERATOR_KEY: &str = "operator-test-key";

pub fn test_vault() -> Vault {
    Vault::new(&Secret::new(TEST_VAULT_KEY.to_string())).unwrap()
}

/// Creates a throwaway database in the temp directory and runs the migrations against it.
pub async fn prepare_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = format!("sqlite://{}/tps_server_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}

/// Builds the full route table (as `create_server_instance` does) and runs one request
/// against it. Returns the response status and body.
pub async fn send_request(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, String) {
    let vault = test_vault();
    let gateway = DeviceApi::new(db.clone(), vault.clone());
    let mercado = MercadoApi::new(MercadoConfig::default()).expect("Error creating provider client");
    let ingest = IngestApi::new(db.clone(), MercadoFeed::new(mercado), vault, IngestOptions::default());
    let options =
        ServerOptions { use_x_forwarded_for: false, operator_api_key: Some(Secret::new(OPERATOR_KEY.to_string())) };
    let admin_scope = web::scope("/admin")
        .service(create_merchant)
        .service(rotate_merchant_token)
        .service(block_device)
        .service(unblock_device);
    let app = App::new()
        .wrap(Logger::default().log_target("tps::access_log"))
        .app_data(web::Data::new(gateway))
        .app_data(web::Data::new(ingest))
        .app_data(web::Data::new(options))
        .service(health)
        .service(register)
        .service(status)
        .service(payments)
        .service(heartbeat)
        .service(notify)
        .service(poll_now)
        .service(admin_scope);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let (_, res) = res.into_parts();
            let http_status = res.status();
            let bytes = body::to_bytes(res.into_body()).await.expect("Error reading response body");
            let body = String::from_utf8_lossy(&bytes).into_owned();
            (http_status, body)
        },
        Err(e) => {
            let res = e.error_response();
            let http_status = res.status();
            let bytes = body::to_bytes(res.into_body()).await.expect("Error reading response body");
            let body = String::from_utf8_lossy(&bytes).into_owned();
            (http_status, body)
        },
    }
}

pub fn with_operator_key(req: TestRequest) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {OPERATOR_KEY}")))
}

pub fn with_device_key(req: TestRequest, api_key: &str, serial: &str) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {api_key}")))
        .insert_header(("Device-Serial", serial.to_string()))
}
