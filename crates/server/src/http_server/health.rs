/// Liveness probe for the fronting proxy.
pub async fn liveness() -> &'static str {
    "ok"
}
