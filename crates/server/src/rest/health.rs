use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

fn health(status: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status,
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn healthz() -> Json<HealthResponse> {
    health("ok")
}

/// Rule endpoints are usable as soon as the listener is bound; the config
/// store is contacted per request.
pub async fn ready() -> Json<HealthResponse> {
    health("ready")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthz_reports_package() {
        let Json(body) = healthz().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "flowguard-server");
    }
}
