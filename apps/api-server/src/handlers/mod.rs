//! HTTP handlers and route configuration.

mod health;
mod posts;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Post routes
            .service(
                web::scope("/v1")
                    .route("/posts", web::post().to(posts::create))
                    .route("/posts/{id}", web::patch().to(posts::update))
                    .route("/posts/{id}", web::delete().to(posts::delete))
                    .route("/posts/{id}", web::get().to(posts::find))
                    .route("/search/{keyword}", web::get().to(posts::search)),
            ),
    );
}
