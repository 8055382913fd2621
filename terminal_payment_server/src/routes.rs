//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are written against the concrete [`SqliteDatabase`] backend; the generic seams
//! live in the engine, where they are tested with scripted fakes.
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::*;
use terminal_payment_engine::{
    api::{MerchantBinding, RegisterDevice},
    db_types::DeviceStatus,
    DeviceApi,
    IngestApi,
    PassOutcome,
    SqliteDatabase,
    BLOCKED_DEVICE_MESSAGE,
};
use tps_common::{Money, Secret};

use crate::{
    auth::{authenticate_device, check_operator_key},
    config::ServerOptions,
    data_objects::{
        DeviceStatusResponse,
        JsonResponse,
        MerchantResponse,
        NewMerchantRequest,
        NotifyPaymentRequest,
        PaymentListParams,
        PaymentView,
        PollSummaryResponse,
        RegisterDeviceRequest,
        RegisterDeviceResponse,
        RotateTokenRequest,
    },
    errors::ServerError,
    integrations::mercado::MercadoFeed,
};

type Gateway = DeviceApi<SqliteDatabase>;
type Ingest = IngestApi<SqliteDatabase, MercadoFeed>;

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// --------------------------------------------   Registration  ------------------------------------------------
/// Route handler for device registration.
///
/// The caller binds the new device to a merchant with exactly one of:
/// * `activation_code` - a pre-shared code that must resolve to an existing merchant, or
/// * `access_token` - the merchant's provider token, supplied inline. The server reuses the
///   merchant that already holds this token, or creates one.
///
/// The response carries the plaintext device API key. It is minted fresh on every call and
/// never stored, so this is the only time it is visible. Re-registering an existing serial
/// rotates its key and reactivates it.
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterDeviceRequest>,
    api: web::Data<Gateway>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST register for device serial '{}'", request.serial);
    let binding = match (request.activation_code, request.access_token) {
        (Some(code), None) => MerchantBinding::ActivationCode(code),
        (None, Some(token)) => MerchantBinding::DirectToken {
            access_token: Secret::new(token),
            merchant_name: request.merchant_name,
        },
        _ => {
            return Err(ServerError::InvalidRequestBody(
                "Supply exactly one of activation_code or access_token".to_string(),
            ))
        },
    };
    let registered = api.register(RegisterDevice { serial: request.serial, binding }).await?;
    let response = RegisterDeviceResponse {
        device_id: registered.device_id,
        merchant_id: registered.merchant_id,
        api_key: registered.api_key.into_inner(),
    };
    Ok(HttpResponse::Created().json(response))
}

// --------------------------------------------   Device surface  ----------------------------------------------
/// Route handler for the status endpoint.
///
/// Blocked devices can still reach this endpoint; it is how a terminal learns that it has
/// been blocked rather than being silently locked out.
#[get("/status")]
pub async fn status(
    req: HttpRequest,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let device = authenticate_device(&req, api.as_ref(), options.as_ref()).await?;
    trace!("💻️ GET status for device '{}'", device.serial);
    let message = (device.status == DeviceStatus::Blocked).then(|| BLOCKED_DEVICE_MESSAGE.to_string());
    Ok(HttpResponse::Ok().json(DeviceStatusResponse::from_device(&device, message)))
}

/// Route handler for the payments endpoint.
///
/// Returns the device's merchant's most recent payments, newest first. `limit` is clamped
/// server-side; terminals poll shallowly. Blocked devices get a 403 with the standard
/// blocked-device message.
#[get("/payments")]
pub async fn payments(
    req: HttpRequest,
    params: web::Query<PaymentListParams>,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let device = authenticate_device(&req, api.as_ref(), options.as_ref()).await?;
    debug!("💻️ GET payments for device '{}' (limit {:?})", device.serial, params.limit);
    let payments = api.recent_payments(&device, params.limit).await?;
    let view = payments.into_iter().map(PaymentView::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(view))
}

/// Route handler for the notification push endpoint.
///
/// Terminals that observe a payment locally push it here instead of waiting for the provider
/// poll to confirm it. The server mints the external id, so the record never collides with a
/// provider-assigned one; it lands in the feed with the `notified` status. Blocked devices
/// are refused, same as the payments endpoint.
#[post("/notify")]
pub async fn notify(
    req: HttpRequest,
    body: web::Json<NotifyPaymentRequest>,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let device = authenticate_device(&req, api.as_ref(), options.as_ref()).await?;
    let request = body.into_inner();
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(ServerError::InvalidRequestBody("The amount must be a positive number".to_string()));
    }
    debug!("💻️ POST notify from device '{}' for {}", device.serial, request.amount);
    let payment = api.record_notification(&device, Money::from_decimal(request.amount), request.payer_name).await?;
    Ok(HttpResponse::Created().json(PaymentView::from(payment)))
}

/// Route handler for the heartbeat endpoint. Refreshes the device's liveness record.
#[post("/heartbeat")]
pub async fn heartbeat(
    req: HttpRequest,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let device = authenticate_device(&req, api.as_ref(), options.as_ref()).await?;
    trace!("💻️ POST heartbeat from device '{}'", device.serial);
    let ip = crate::helpers::get_remote_ip(&req, options.use_x_forwarded_for).map(|ip| ip.to_string());
    api.heartbeat(&device, ip.as_deref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": device.status.to_string() })))
}

// -------------------------------------------   Operator surface  ---------------------------------------------
/// Route handler for the manual poll trigger.
///
/// Runs one ingestion pass immediately, sharing the single-flight guard with the background
/// worker. If a pass is already in flight this request is skipped, not queued, and the caller
/// is told so.
#[post("/poll")]
pub async fn poll_now(
    req: HttpRequest,
    ingest: web::Data<Ingest>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    check_operator_key(&req, options.as_ref())?;
    info!("💻️ Manual ingestion pass requested");
    match ingest.poll_all_merchants().await? {
        PassOutcome::Completed(summary) => Ok(HttpResponse::Ok().json(PollSummaryResponse::from(summary))),
        PassOutcome::AlreadyRunning => {
            Ok(HttpResponse::Accepted().json(JsonResponse::failure("An ingestion pass is already running")))
        },
    }
}

/// Route handler for creating a merchant. The provider token is encrypted before it touches
/// storage and never appears in the response.
#[post("/merchants")]
pub async fn create_merchant(
    req: HttpRequest,
    body: web::Json<NewMerchantRequest>,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    check_operator_key(&req, options.as_ref())?;
    let request = body.into_inner();
    debug!("💻️ POST create merchant '{}'", request.name);
    let merchant = api
        .create_merchant(
            &request.name,
            &Secret::new(request.access_token),
            request.activation_code,
            request.plan,
        )
        .await?;
    Ok(HttpResponse::Created().json(MerchantResponse::from(merchant)))
}

/// Route handler for rotating a merchant's provider token. Takes effect on the next
/// ingestion tick; no restart required.
#[post("/merchants/{id}/token")]
pub async fn rotate_merchant_token(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<RotateTokenRequest>,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    check_operator_key(&req, options.as_ref())?;
    let merchant_id = path.into_inner();
    debug!("💻️ POST rotate token for merchant [{merchant_id}]");
    api.rotate_merchant_token(merchant_id, &Secret::new(body.into_inner().access_token)).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Token rotated for merchant {merchant_id}"))))
}

#[post("/devices/{id}/block")]
pub async fn block_device(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    set_device_status(req, path.into_inner(), DeviceStatus::Blocked, api, options).await
}

#[post("/devices/{id}/unblock")]
pub async fn unblock_device(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    set_device_status(req, path.into_inner(), DeviceStatus::Active, api, options).await
}

async fn set_device_status(
    req: HttpRequest,
    device_id: i64,
    new_status: DeviceStatus,
    api: web::Data<Gateway>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    check_operator_key(&req, options.as_ref())?;
    debug!("💻️ POST set device [{device_id}] status to {new_status}");
    let device = api.set_device_status(device_id, new_status).await?;
    Ok(HttpResponse::Ok().json(DeviceStatusResponse::from_device(&device, None)))
}
