use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde_json::{json, Value};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::auth::{Access, AuthMode, Claim, Entity, Profile, Session, SignUp};
use crate::error::AppError;
use crate::model::{
    CreateListing, CreateOrderItem, CreateTodo, ListQuery, Listing, OrderItem, Page, Todo,
    UpdateListing, UpdateOrderItem,
};
use crate::AppState;

// --- listings ---

pub async fn list_listings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Listing>>, AppError> {
    state.authorize(&headers, Entity::Listing, Access::Read).await?;
    let page = state
        .store
        .list_listings(query.next_token.as_deref(), query.limit)
        .await;
    Ok(Json(page))
}

pub async fn get_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Listing>, AppError> {
    state.authorize(&headers, Entity::Listing, Access::Read).await?;
    state.store.get_listing(&id).await.map(Json)
}

pub async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateListing>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    let mode = state.authorize(&headers, Entity::Listing, Access::Write).await?;
    let listing = state.store.create_listing(input).await?;
    info!(listing_id = %listing.id, seller_id = %listing.seller_id, %mode, "listing created");
    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn update_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateListing>,
) -> Result<Json<Listing>, AppError> {
    let mode = state.authorize(&headers, Entity::Listing, Access::Write).await?;
    let listing = state.store.update_listing(&id, input).await?;
    info!(listing_id = %listing.id, status = ?listing.status, %mode, "listing updated");
    Ok(Json(listing))
}

// --- order items ---

pub async fn list_order_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<OrderItem>>, AppError> {
    state.authorize(&headers, Entity::OrderItem, Access::Read).await?;
    let page = state
        .store
        .list_order_items(
            query.listing_id.as_deref(),
            query.next_token.as_deref(),
            query.limit,
        )
        .await;
    Ok(Json(page))
}

pub async fn get_order_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderItem>, AppError> {
    state.authorize(&headers, Entity::OrderItem, Access::Read).await?;
    state.store.get_order_item(&id).await.map(Json)
}

pub async fn create_order_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateOrderItem>,
) -> Result<(StatusCode, Json<OrderItem>), AppError> {
    let mode = state.authorize(&headers, Entity::OrderItem, Access::Write).await?;
    let item = state.store.create_order_item(input).await?;
    info!(order_item_id = %item.id, listing_id = %item.listing_id, %mode, "order item created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_order_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateOrderItem>,
) -> Result<Json<OrderItem>, AppError> {
    let mode = state.authorize(&headers, Entity::OrderItem, Access::Write).await?;
    let item = state.store.update_order_item(&id, input).await?;
    info!(order_item_id = %item.id, status = ?item.status, %mode, "order item updated");
    Ok(Json(item))
}

// --- todos ---

pub async fn list_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Todo>>, AppError> {
    state.authorize(&headers, Entity::Todo, Access::Read).await?;
    Ok(Json(state.store.list_todos().await))
}

pub async fn create_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    state.authorize(&headers, Entity::Todo, Access::Write).await?;
    Ok((StatusCode::CREATED, Json(state.store.create_todo(input).await)))
}

/// Server-sent events: one `todo` event per Todo created after subscribing.
pub async fn observe_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state.authorize(&headers, Entity::Todo, Access::Read).await?;
    let events = BroadcastStream::new(state.store.subscribe_todos()).filter_map(|received| {
        match received {
            Ok(todo) => Event::default().event("todo").json_data(&todo).ok().map(Ok),
            Err(lagged) => {
                warn!(error = %lagged, "todo observer fell behind");
                None
            }
        }
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// --- auth ---

/// Public view of the backend configuration. Never includes secrets.
pub async fn backend_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "auth": state.settings.auth,
        "data": state.settings.data,
    }))
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUp>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    state.settings.auth.validate_sign_up(&input)?;
    let session = state.store.sign_up(input).await?;
    info!(user_id = %session.user_id, "user signed up");
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Profile>, AppError> {
    let claim = Claim::from_headers(&headers)?;
    if claim.mode != AuthMode::UserPool {
        return Err(AppError::Unauthenticated(
            "a user session is required".to_string(),
        ));
    }
    state
        .store
        .session_profile(&claim.credential)
        .await
        .map(Json)
        .ok_or_else(|| AppError::Unauthenticated("session is not valid".to_string()))
}
