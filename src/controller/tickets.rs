use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};

use serde::Serialize;

use url::Url;

use crate::error::{RestError, RestResult};
use crate::repo::query::TicketListParams;
use crate::repo::{Store, TicketListing, TicketQuery};
use crate::settings::AdminSettings;

#[derive(Debug, Serialize)]
struct PageBody {
    count: i64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<TicketListing>,
}

#[tracing::instrument(name = "List ticket responses", skip(req, store, admin))]
#[get("")]
async fn list(
    req: HttpRequest,
    params: web::Query<TicketListParams>,
    store: web::Data<dyn Store>,
    admin: web::Data<AdminSettings>,
) -> RestResult<impl Responder> {
    let query =
        TicketQuery::from_params(&params, admin.page_limits()).map_err(RestError::ParseError)?;

    let page = store.list_tickets(&query).await?;

    let url = req.full_url();
    let next = query
        .offset
        .checked_add(query.limit)
        .filter(|next| *next < page.count)
        .map(|next| page_url(&url, query.limit, next));
    let previous = (query.offset > 0)
        .then(|| page_url(&url, query.limit, query.offset.saturating_sub(query.limit).max(0)));

    Ok(HttpResponse::Ok().json(PageBody {
        count: page.count,
        next,
        previous,
        results: page.results,
    }))
}

#[tracing::instrument(name = "Count ticket responses", skip(store))]
#[get("/count")]
async fn count(store: web::Data<dyn Store>) -> RestResult<impl Responder> {
    let counts = store.count_tickets().await?;

    Ok(HttpResponse::Ok().json(counts))
}

/// `url` with its paging parameters replaced; a zero offset is left out
fn page_url(url: &Url, limit: i64, offset: i64) -> String {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "limit" && key != "offset")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = url.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear().extend_pairs(kept);
        pairs.append_pair("limit", &limit.to_string());
        if offset > 0 {
            pairs.append_pair("offset", &offset.to_string());
        }
    }

    url.to_string()
}

/// Staff listing endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/tickets").service(count).service(list)
}
