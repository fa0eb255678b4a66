//! K-pop lookup service: binary entrypoint.
//! Boots the Axum HTTP server through Shuttle, wiring config, collaborators and routes.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    kpop_lookup::logging::init_tracing();

    let router = kpop_lookup::app()
        .await
        .map_err(shuttle_runtime::Error::Custom)?;

    Ok(router.into())
}
