//! Health check endpoint.

/// Liveness check. Does not touch the database.
pub async fn health() -> &'static str {
    "OK"
}
