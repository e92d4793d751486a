use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::warn;

use crate::{
    application::{deadline::Deadline, usercases::subscriptions::SubscriptionUseCase},
    config::config_model::RequestTimeouts,
    domain::{
        repositories::subscriptions::SubscriptionRepository,
        value_objects::{
            subscription_filter::{SubscriptionFilterInput, SubscriptionKeyInput, SummaryInput},
            subscriptions::SubscriptionInput,
        },
    },
    infrastructure::axum_http::error_responses::ErrorResponse,
};

// Run example
//   curl "http://localhost:$SERVER_PORT/api/subscriptions?service_name=Netflix&limit=10"
//   curl -X POST "http://localhost:$SERVER_PORT/api/subscriptions/summary" \
//     -H "Content-Type: application/json" \
//     -d '{"start_date":"01-2024","end_date":"12-2024"}'

pub struct SubscriptionRouteState<T>
where
    T: SubscriptionRepository + Send + Sync,
{
    usecase: Arc<SubscriptionUseCase<T>>,
    timeouts: RequestTimeouts,
}

impl<T> Clone for SubscriptionRouteState<T>
where
    T: SubscriptionRepository + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            usecase: Arc::clone(&self.usecase),
            timeouts: self.timeouts,
        }
    }
}

impl<T> SubscriptionRouteState<T>
where
    T: SubscriptionRepository + Send + Sync,
{
    pub fn new(usecase: Arc<SubscriptionUseCase<T>>, timeouts: RequestTimeouts) -> Self {
        Self { usecase, timeouts }
    }

    fn read_deadline(&self) -> Deadline {
        Deadline::after(self.timeouts.long)
    }

    fn write_deadline(&self) -> Deadline {
        Deadline::after(self.timeouts.short)
    }
}

pub fn routes<T>(usecase: Arc<SubscriptionUseCase<T>>, timeouts: RequestTimeouts) -> Router
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/",
            get(list::<T>)
                .post(create::<T>)
                .put(update::<T>)
                .delete(remove::<T>),
        )
        .route("/summary", post(summary::<T>))
        .with_state(SubscriptionRouteState::new(usecase, timeouts))
}

pub async fn list<T>(
    State(state): State<SubscriptionRouteState<T>>,
    query: Result<Query<SubscriptionFilterInput>, QueryRejection>,
) -> Response
where
    T: SubscriptionRepository + Send + Sync,
{
    let Query(filter_input) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request("invalid query", rejection.body_text()),
    };

    match state.usecase.search(filter_input, state.read_deadline()).await {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create<T>(
    State(state): State<SubscriptionRouteState<T>>,
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Response
where
    T: SubscriptionRepository + Send + Sync,
{
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request("invalid request body", rejection.body_text()),
    };

    match state
        .usecase
        .create_subscription(input, state.write_deadline())
        .await
    {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update<T>(
    State(state): State<SubscriptionRouteState<T>>,
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Response
where
    T: SubscriptionRepository + Send + Sync,
{
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request("invalid request body", rejection.body_text()),
    };

    match state
        .usecase
        .update_subscription(input, state.write_deadline())
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn remove<T>(
    State(state): State<SubscriptionRouteState<T>>,
    query: Result<Query<SubscriptionKeyInput>, QueryRejection>,
) -> Response
where
    T: SubscriptionRepository + Send + Sync,
{
    let Query(key_input) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request("invalid query", rejection.body_text()),
    };

    match state
        .usecase
        .delete_subscription(key_input, state.write_deadline())
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn summary<T>(
    State(state): State<SubscriptionRouteState<T>>,
    payload: Result<Json<SummaryInput>, JsonRejection>,
) -> Response
where
    T: SubscriptionRepository + Send + Sync,
{
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request("invalid request body", rejection.body_text()),
    };

    match state
        .usecase
        .summarize(SubscriptionFilterInput::from(input), state.read_deadline())
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn bad_request(message: &'static str, detail: String) -> Response {
    warn!(detail = %detail, "subscriptions: {message}");
    ErrorResponse::new(StatusCode::BAD_REQUEST, message).into_response()
}
