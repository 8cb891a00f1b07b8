use http::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use http::Method;
use tower_http::cors::CorsLayer;

pub mod client;
pub mod v1;

/// Header selecting the client command ("run" or "read") on fetch.
pub const COMMAND_HEADER: &str = "x-jingui-command";

/// Build a CORS layer for the configured origins. No origins, no layer —
/// the API is same-origin by default behind the reverse proxy.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    Some(
        CorsLayer::new()
            .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(vec![
                ACCEPT,
                AUTHORIZATION,
                CONTENT_TYPE,
                ORIGIN,
                HeaderName::from_static(COMMAND_HEADER),
            ])
            .allow_origin(origins)
            .allow_credentials(false),
    )
}
