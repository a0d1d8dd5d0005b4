use actix_web::{error, web, HttpResponse};

use super::handlers::{self, ErrorResponse};

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Bodies with missing or mistyped fields are rejected before any handler runs
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorResponse {
            error: format!("Missing values: {}", err),
        });
        error::InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_config).service(
        web::scope("/api/v1")
            .route("/mine", web::get().to(handlers::mine))
            .route("/transactions/new", web::post().to(handlers::new_transaction))
            .route("/transactions/pending", web::get().to(handlers::get_pending_transactions))
            .route("/balance", web::post().to(handlers::get_balance))
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/validate", web::get().to(handlers::validate_chain))
            .route("/nodes/register", web::post().to(handlers::register_nodes))
            .route("/nodes/resolve", web::get().to(handlers::resolve_conflicts))
            .route("/wallet/new", web::get().to(handlers::create_wallet)),
    );
}
