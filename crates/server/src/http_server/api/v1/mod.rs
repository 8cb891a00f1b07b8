use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

pub mod debug_policy;
pub mod instances;
pub mod secrets;
pub mod vaults;

use crate::http_server::middleware::admin_auth;
use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    // Admin CRUD surface, behind the bearer token.
    let admin = Router::new()
        .route(
            "/vaults",
            post(vaults::create::handler).get(vaults::list::handler),
        )
        .route(
            "/vaults/:id",
            get(vaults::get::handler)
                .put(vaults::update::handler)
                .delete(vaults::delete::handler),
        )
        .route("/vaults/:id/items", get(vaults::items::list_handler))
        .route(
            "/vaults/:id/items/:section",
            get(vaults::items::get_handler)
                .put(vaults::items::put_handler)
                .delete(vaults::items::delete_handler),
        )
        .route("/vaults/:id/instances", get(vaults::grants::list_handler))
        .route(
            "/vaults/:id/instances/:fid",
            post(vaults::grants::grant_handler).delete(vaults::grants::revoke_handler),
        )
        .route(
            "/instances",
            post(instances::register::handler).get(instances::list::handler),
        )
        .route(
            "/instances/:fid",
            get(instances::get::handler)
                .put(instances::update::handler)
                .delete(instances::delete::handler),
        )
        .route(
            "/debug-policy/:vault/:fid",
            get(debug_policy::get_handler).put(debug_policy::put_handler),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    // Protocol endpoints authenticate through the challenge itself.
    Router::new()
        .route("/secrets/challenge", post(secrets::challenge::handler))
        .route("/secrets/fetch", post(secrets::fetch::handler))
        .merge(admin)
        .with_state(state)
}
