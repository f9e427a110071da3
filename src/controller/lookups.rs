use actix_web::dev::HttpServiceFactory;
use actix_web::{route, web, HttpResponse, Responder};

use crate::error::RestResult;
use crate::repo::Store;

// POST is accepted for the admin client, which fetches lookups that way

#[tracing::instrument(name = "List locations", skip(store))]
#[route("", method = "GET", method = "POST")]
async fn locations(store: web::Data<dyn Store>) -> RestResult<impl Responder> {
    let locations = store.fetch_locations().await?;

    Ok(HttpResponse::Ok().json(locations))
}

#[tracing::instrument(name = "List regions", skip(store))]
#[route("", method = "GET", method = "POST")]
async fn regions(store: web::Data<dyn Store>) -> RestResult<impl Responder> {
    let regions = store.fetch_regions().await?;

    Ok(HttpResponse::Ok().json(regions))
}

pub fn locations_scope() -> impl HttpServiceFactory {
    web::scope("/locations").service(locations)
}

pub fn regions_scope() -> impl HttpServiceFactory {
    web::scope("/regions").service(regions)
}
