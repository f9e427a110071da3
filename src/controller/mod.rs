use actix_web::dev::HttpServiceFactory;
use actix_web::web;

pub mod lookups;
pub mod pdf;
pub mod submissions;
pub mod tickets;
pub mod users;

/// Every `/api/v1` endpoint
pub fn api_scope() -> impl HttpServiceFactory {
    web::scope("/api/v1")
        .service(submissions::scope())
        .service(tickets::scope())
        .service(pdf::scope())
        .service(pdf::printed_scope())
        .service(lookups::locations_scope())
        .service(lookups::regions_scope())
        .service(users::user_info_scope())
        .service(users::accept_terms_scope())
}
