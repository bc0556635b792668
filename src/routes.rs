use crate::api::{attendance, report};
use crate::config::Config;
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::error::InternalError;
use actix_web::{HttpResponse, web};
use anyhow::anyhow;
use serde_json::json;

pub type RateLimitConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Milliseconds before the limiter hands out one more request.
fn replenish_interval_ms(requests_per_min: u32) -> u64 {
    (60_000 / requests_per_min.max(1) as u64).max(1)
}

/// Per-IP limiter shared by every route under the API prefix.
pub fn rate_limit_config(requests_per_min: u32) -> anyhow::Result<RateLimitConfig> {
    let requests_per_min = requests_per_min.max(1);

    GovernorConfigBuilder::default()
        .milliseconds_per_request(replenish_interval_ms(requests_per_min))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} requests/min"))
}

/// Malformed JSON bodies get the same envelope as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({
                "success": false,
                "message": "Invalid request body",
                "error": detail
            })),
        )
        .into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, rate_limit: &RateLimitConfig) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(Governor::new(rate_limit)) // rate limiting
            .app_data(json_config())
            .configure(api_routes),
    );
}

/// Routes relative to the API prefix. Authentication happens in the
/// [`AuthUser`](crate::auth::auth::AuthUser) extractor of each handler.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            // /reports/attendance
            .service(
                web::resource("/attendance")
                    .route(web::post().to(report::attendance_report)),
            )
            // /reports/attendance/export/{format}
            .service(
                web::resource("/attendance/export/{format}")
                    .route(web::post().to(report::export_attendance_report)),
            ),
    )
    .service(
        web::scope("/attendance")
            // /attendance
            .service(web::resource("").route(web::get().to(attendance::list_attendance)))
            // /attendance/me
            .service(web::resource("/me").route(web::get().to(attendance::my_attendance)))
            // /attendance/reports
            .service(web::resource("/reports").route(web::get().to(report::employee_report)))
            // /attendance/check-in
            .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
            // /attendance/check-out
            .service(web::resource("/check-out").route(web::post().to(attendance::check_out))),
    );
}
