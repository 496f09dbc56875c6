use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::api::model::app_state::AppState;
use crate::auth::authenticator::AuthUser;
use crate::messaging::{send_message, MsgKind};
use crate::model::CryptoCurrency;
use crate::service::payment_service::{self, CreatePaymentRequest, VerifyPaymentRequest};
use crate::service::price_service::get_price;
use crate::streamhub_error::StreamHubError;

async fn plans(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let payment = &app_state.config.payment;
    Json(json!({
        "fiatCurrency": payment.fiat_currency,
        "plans": payment.plans,
        "currencies": {
            "btc": payment.btc_address.is_some(),
            "sol": payment.sol_address.is_some(),
        },
    }))
}

async fn prices(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let (btc, sol) = tokio::join!(
        get_price(&app_state.http_client, &app_state.config.payment, CryptoCurrency::Btc),
        get_price(&app_state.http_client, &app_state.config.payment, CryptoCurrency::Sol)
    );
    Json(json!({"btc": btc, "sol": sol}))
}

async fn create(app_state: &AppState, user_id: &str, plan: &str, currency: CryptoCurrency) -> Result<axum::response::Response, StreamHubError> {
    let payment = payment_service::create_payment(&app_state.config, &app_state.repos, &app_state.http_client,
                                                  user_id, plan, currency, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(payment)).into_response())
}

async fn create_bitcoin(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    create(&app_state, &user.id, &req.plan, CryptoCurrency::Btc).await
}

async fn create_solana(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    create(&app_state, &user.id, &req.plan, CryptoCurrency::Sol).await
}

async fn verify(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let payment = payment_service::verify_payment(&app_state.config, &app_state.repos, &app_state.http_client,
                                                  &user.id, &id, &req, Utc::now()).await?;
    send_message(MsgKind::Payment, app_state.config.messaging.as_ref(),
                 &format!("Payment confirmed: {} {} ({} plan) by {}", payment.crypto_amount, payment.currency, payment.plan, user.username));
    Ok(Json(payment))
}

async fn get_payment(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StreamHubError> {
    Ok(Json(payment_service::get_payment(&app_state.repos, &user.id, user.is_admin(), &id).await?))
}

async fn list_payments(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> impl IntoResponse {
    Json(payment_service::list_payments(&app_state.repos, &user.id).await)
}

pub fn payment_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/payments", axum::routing::get(list_payments))
        .route("/payments/plans", axum::routing::get(plans))
        .route("/payments/prices", axum::routing::get(prices))
        .route("/payments/bitcoin", axum::routing::post(create_bitcoin))
        .route("/payments/solana", axum::routing::post(create_solana))
        .route("/payments/{id}", axum::routing::get(get_payment))
        .route("/payments/{id}/verify", axum::routing::post(verify))
}
