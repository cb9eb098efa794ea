use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "claimmon API",
        description = "Monitoring API of the claims assistant: metrics, alerts and health",
    ),
    tags(
        (name = "Health", description = "Health probes"),
        (name = "Dashboard", description = "Monitoring dashboard")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (router, spec) = api::routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(spec);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .with_state(state.clone())
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", merged_spec))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state, logging::request_logging))
}
