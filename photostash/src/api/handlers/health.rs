/// Liveness probe. Checks no dependencies.
pub async fn health() -> &'static str {
    "OK"
}
