use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::backlog::{BacklogResponse, FlushResponse};
use super::api::error::ErrorResponse;
use super::api::tracker::{IntervalRequest, IntervalsResponse, StartRequest};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::tracker::start,
        super::api::tracker::stop,
        super::api::tracker::status,
        super::api::tracker::intervals,
        super::api::tracker::set_interval,
        super::api::backlog::list,
        super::api::backlog::flush,
    ),
    components(
        schemas(
            StartRequest,
            IntervalRequest,
            IntervalsResponse,
            BacklogResponse,
            FlushResponse,
            ErrorResponse,
            crate::tracker::TrackerMode,
            crate::tracker::TrackerStatus,
            crate::point::Point,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Trackpost Control API",
        description = "Start and stop location capture, inspect and flush the offline backlog",
        version = "0.1.0"
    ),
    tags(
        (name = "tracker", description = "Capture lifecycle"),
        (name = "backlog", description = "Points awaiting upload")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
