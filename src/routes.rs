use crate::{
    api::{employee, timesheet},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public auth routes
    cfg.service(
        web::scope(&format!("{}/auth", config.api_prefix))
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Employee directory
    cfg.service(
        web::scope(&format!("{}/employees", config.api_prefix))
            // /employees
            .service(
                web::resource("")
                    .route(web::post().to(employee::create_employee))
                    .route(web::get().to(employee::list_employees)),
            )
            // /employees/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(employee::get_employee))
                    .route(web::put().to(employee::update_employee))
                    .route(web::delete().to(employee::delete_employee)),
            ),
    );

    // Timesheet workflow, bearer token required
    cfg.service(
        web::scope(&format!("{}/timesheets", config.api_prefix))
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/punch-in").route(web::post().to(timesheet::punch_in)))
            .service(web::resource("/lunch-in").route(web::post().to(timesheet::lunch_in)))
            .service(web::resource("/lunch-out").route(web::post().to(timesheet::lunch_out)))
            .service(web::resource("/break-in").route(web::post().to(timesheet::break_in)))
            .service(web::resource("/break-out").route(web::post().to(timesheet::break_out)))
            .service(web::resource("/punch-out").route(web::post().to(timesheet::punch_out)))
            .service(web::resource("/current").route(web::get().to(timesheet::current)))
            .service(web::resource("/history").route(web::get().to(timesheet::history)))
            .service(
                web::resource("/activity-log").route(web::get().to(timesheet::activity_log)),
            ),
    );
}
