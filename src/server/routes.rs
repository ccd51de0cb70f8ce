use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use log::debug;
use rust_decimal::Decimal;

use crate::cache::CacheStatus;
use crate::fetch::decode::value_to_decimal;
use crate::services::{select_all, select_best_network, select_one};

use super::responses::{
    ApiError, AssetListResponse, AssetResponse, BestNetworkRequest, BestNetworkResponse,
    CacheMeta, RefreshResponse, RootResponse, WithdrawFeesRequest,
};
use super::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/get-withdraw-fees", post(withdraw_fees_by_body))
        .route("/withdraw-fees", get(all_withdraw_fees))
        .route("/withdraw-fees/:coin", get(withdraw_fees_by_path))
        .route("/best-network", post(best_network))
        .route("/cache/status", get(cache_status))
        .route("/cache/refresh", post(cache_refresh))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "Server is running",
    })
}

async fn withdraw_fees_by_body(
    State(state): State<AppState>,
    payload: Result<Json<WithdrawFeesRequest>, JsonRejection>,
) -> Result<Json<AssetResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let coin = required_coin(request.coin)?;
    asset_response(&state, &coin).await
}

async fn withdraw_fees_by_path(
    State(state): State<AppState>,
    Path(coin): Path<String>,
) -> Result<Json<AssetResponse>, ApiError> {
    let coin = required_coin(Some(coin))?;
    asset_response(&state, &coin).await
}

async fn all_withdraw_fees(
    State(state): State<AppState>,
) -> Result<Json<AssetListResponse>, ApiError> {
    let now = Utc::now();
    let read = state.cache.get_data(now).await?;
    let assets = select_all(read.snapshot.assets(), &state.policy);

    Ok(Json(AssetListResponse {
        count: assets.len(),
        assets,
        cache: CacheMeta::new(&read, now),
    }))
}

async fn best_network(
    State(state): State<AppState>,
    payload: Result<Json<BestNetworkRequest>, JsonRejection>,
) -> Result<Json<BestNetworkResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let coin = required_coin(request.coin)?;
    let amount = value_to_decimal(&request.amount)
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| ApiError::BadRequest("Amount must be a positive number".to_string()))?;

    let now = Utc::now();
    let read = state.cache.get_data(now).await?;
    let network = select_best_network(
        read.snapshot.assets(),
        &coin,
        amount,
        &request.networks,
        &state.policy,
    )?;

    debug!(
        "Best network for {amount} {coin}: {:?}",
        network.as_ref().map(|n| &n.network)
    );

    Ok(Json(BestNetworkResponse {
        coin: coin.to_uppercase(),
        amount,
        no_eligible_network: network.is_none(),
        network,
        cache: CacheMeta::new(&read, now),
    }))
}

async fn cache_status(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(state.cache.cache_status(Utc::now()))
}

async fn cache_refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let now = Utc::now();
    let read = state.cache.force_refresh(now).await?;

    Ok(Json(RefreshResponse {
        asset_count: read.snapshot.assets().len(),
        cache: CacheMeta::new(&read, now),
    }))
}

async fn asset_response(state: &AppState, coin: &str) -> Result<Json<AssetResponse>, ApiError> {
    let now = Utc::now();
    let read = state.cache.get_data(now).await?;
    let asset = select_one(read.snapshot.assets(), coin, &state.policy)?;

    Ok(Json(AssetResponse {
        asset,
        cache: CacheMeta::new(&read, now),
    }))
}

fn required_coin(coin: Option<String>) -> Result<String, ApiError> {
    coin.map(|coin| coin.trim().to_string())
        .filter(|coin| !coin.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Coin is required (e.g., BTC, ETH, USDT)".to_string())
        })
}
