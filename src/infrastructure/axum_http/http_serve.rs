use crate::{
    application::usercases::subscriptions::SubscriptionUseCase,
    config::config_model::DotEnvyConfig,
    domain::repositories::subscriptions::SubscriptionRepository,
    infrastructure::{
        axum_http::{default_routers, error_responses, routers},
        postgres::{
            postgres_connection::PgPoolSquad, repositories::subscriptions::SubscriptionPostgres,
        },
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub fn router<T>(config: &DotEnvyConfig, subscription_usecase: Arc<SubscriptionUseCase<T>>) -> Result<Router>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/subscriptions",
            routers::subscriptions::routes(subscription_usecase, config.request_timeouts),
        )
        .route("/api/health-check", get(default_routers::health_check))
        .layer(CatchPanicLayer::custom(error_responses::panic_response))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)))
        .layer(RequestBodyLimitLayer::new(
            (config.server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let subscription_usecase = Arc::new(SubscriptionUseCase::new(Arc::new(
        subscription_repository,
    )));

    let app = router(&config, Arc::clone(&subscription_usecase))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.server.port);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    subscription_usecase.close();
    info!("Server stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::config_model::{Database, RequestTimeouts, Server},
        domain::{
            entities::subscriptions::{SubscriptionEntity, UpdateSubscriptionEntity},
            repositories::subscriptions::UpdateOutcome,
            value_objects::{
                months::Month,
                subscription_filter::{SubscriptionFilter, SubscriptionKey},
            },
        },
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    /// Repository whose reads blow up, standing in for a bug below the handlers.
    struct PanickingRepository;

    #[async_trait]
    impl SubscriptionRepository for PanickingRepository {
        async fn search(&self, _filter: &SubscriptionFilter) -> anyhow::Result<Vec<SubscriptionEntity>> {
            panic!("row decoder invariant broken");
        }

        async fn find_overlapping(
            &self,
            _window_start: Month,
            _window_end: Month,
            _user_id: Option<String>,
            _service_name: Option<String>,
        ) -> anyhow::Result<Vec<SubscriptionEntity>> {
            panic!("row decoder invariant broken");
        }

        async fn create(&self, _subscription_entity: SubscriptionEntity) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn update(
            &self,
            _key: SubscriptionKey,
            _update_subscription_entity: UpdateSubscriptionEntity,
        ) -> anyhow::Result<UpdateOutcome> {
            unreachable!()
        }

        async fn delete(&self, _key: SubscriptionKey) -> anyhow::Result<usize> {
            unreachable!()
        }

        fn close(&self) {}
    }

    fn test_config() -> DotEnvyConfig {
        DotEnvyConfig {
            server: Server {
                port: 0,
                body_limit: 1,
                timeout: 30,
            },
            database: Database {
                url: "postgres://unused".to_string(),
                max_connections: 1,
                min_idle: 0,
                connect_timeout: 1,
            },
            request_timeouts: RequestTimeouts::default(),
        }
    }

    fn app() -> Router {
        router(
            &test_config(),
            Arc::new(SubscriptionUseCase::new(Arc::new(PanickingRepository))),
        )
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn handler_panic_becomes_internal_server_error() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/subscriptions?service_name=Netflix")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "internal server error");
    }

    #[tokio::test]
    async fn server_keeps_serving_after_a_panic() {
        let app = app();

        let first = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/subscriptions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let health = app
            .oneshot(
                Request::builder()
                    .uri("/api/health-check")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/subscriptions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], 404);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/subscriptions")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"price\": "))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "invalid request body");
    }
}
