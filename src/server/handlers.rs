//! HTTP handlers for shop operations

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::core::error::{ShopAppResult, ValidationError};
use crate::core::model::{Shop, ShopInput};
use crate::core::query::{PaginatedResponse, ShopListParams};
use crate::core::search::SearchParams;
use crate::service::{ShopSearchService, ShopService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub shops: ShopService,
    pub search: ShopSearchService,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ShopAppResult<T> {
    query.map(|Query(params)| params).map_err(|e| {
        ValidationError::FieldError {
            field: "query".to_string(),
            message: e.body_text(),
        }
        .into()
    })
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ShopAppResult<T> {
    body.map(|Json(payload)| payload).map_err(|e| {
        ValidationError::InvalidJson {
            message: e.body_text(),
        }
        .into()
    })
}

/// GET /shops
pub async fn list_shops(
    State(state): State<AppState>,
    params: Result<Query<ShopListParams>, QueryRejection>,
) -> ShopAppResult<Json<PaginatedResponse<Shop>>> {
    let params = query_params(params)?;
    let page = state.shops.list_shops(&params).await?;
    Ok(Json(page.into_response()))
}

/// GET /shops/{id}
pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ShopAppResult<Json<Shop>> {
    Ok(Json(state.shops.get_shop(id).await?))
}

/// POST /shops
pub async fn create_shop(
    State(state): State<AppState>,
    body: Result<Json<ShopInput>, JsonRejection>,
) -> ShopAppResult<Response> {
    let shop = state.shops.create_shop(json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(shop)).into_response())
}

/// PUT /shops
///
/// The id travels in the body.
pub async fn update_shop(
    State(state): State<AppState>,
    body: Result<Json<ShopInput>, JsonRejection>,
) -> ShopAppResult<Json<Shop>> {
    Ok(Json(state.shops.update_shop(json_body(body)?).await?))
}

/// DELETE /shops/{id}
pub async fn delete_shop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ShopAppResult<StatusCode> {
    state.shops.delete_shop(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /shops/search
pub async fn search_shops(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ShopAppResult<Json<Vec<Shop>>> {
    let params = query_params(params)?;
    Ok(Json(state.search.search_shops(params).await?))
}

/// Health check endpoint handler
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "shop-app"
    }))
}
