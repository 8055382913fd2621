use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use mercado_tools::MercadoApi;
use terminal_payment_engine::{vault::Vault, DeviceApi, IngestApi, IngestOptions, SqliteDatabase};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::mercado::MercadoFeed,
    poll_worker::start_poll_worker,
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

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Database migrations complete");
    let vault = Vault::new(&config.vault_key)?;
    let mercado = MercadoApi::new(config.mercado.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the provider client. {e}")))?;
    let options = IngestOptions { lookback: config.poll_lookback, page_size: config.poll_page_size };
    let ingest = IngestApi::new(db.clone(), MercadoFeed::new(mercado), vault.clone(), options);
    start_poll_worker(ingest.clone(), config.poll_interval);
    let srv = create_server_instance(config, db, vault, ingest)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    vault: Vault,
    ingest: IngestApi<SqliteDatabase, MercadoFeed>,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let gateway = DeviceApi::new(db.clone(), vault.clone());
        let options = ServerOptions::from_config(&config);
        let admin_scope = web::scope("/admin")
            .service(create_merchant)
            .service(rotate_merchant_token)
            .service(block_device)
            .service(unblock_device);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tps::access_log"))
            .app_data(web::Data::new(gateway))
            .app_data(web::Data::new(ingest.clone()))
            .app_data(web::Data::new(options))
            .service(health)
            .service(register)
            .service(status)
            .service(payments)
            .service(heartbeat)
            .service(notify)
            .service(poll_now)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
