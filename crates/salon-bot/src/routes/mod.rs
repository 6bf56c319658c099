//! Route handlers for the health, metrics and payment endpoints.

pub mod health;
pub mod metrics;
pub mod payments;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the router. `/metrics` is mounted only when enabled.
pub fn router(metrics_enabled: bool) -> Router<AppState> {
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/payments/pay", get(payments::pay));
    if metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics));
    }
    router.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use database::{Database, PgPool};
    use dialog::Stats;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::metrics::Metrics;

    /// State whose pool never connects.
    fn state() -> AppState {
        let pool = PgPool::connect_lazy("postgres://salon@localhost/unused").unwrap();
        AppState::new(
            Database::from_pool(pool),
            Arc::new(Metrics::new()),
            Arc::new(Stats::default()),
        )
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(false).with_state(state());
        assert_eq!(get(app, "/health").await, (StatusCode::OK, "OK".to_string()));
    }

    #[tokio::test]
    async fn test_metrics_only_when_enabled() {
        let (status, _) = get(router(false).with_state(state()), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let state = state();
        state.metrics.update_received();
        let (status, body) = get(router(true).with_state(state), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("salon_updates_received_total 1"));
    }

    #[tokio::test]
    async fn test_pay_rejects_bad_invoice() {
        for uri in ["/payments/pay", "/payments/pay?invoice=", "/payments/pay?invoice=abc", "/payments/pay?invoice=-3"] {
            let (status, body) = get(router(false).with_state(state()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body.contains("invoice"), "{uri}: {body}");
        }
    }
}
