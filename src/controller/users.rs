use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use chrono::{DateTime, Utc};

use serde::Serialize;

use crate::auth::RequestContext;
use crate::error::RestResult;
use crate::repo::Store;
use crate::settings::AuthSettings;

#[derive(Debug, Serialize)]
struct UserInfoBody<'a> {
    accepted_terms_at: Option<DateTime<Utc>>,
    user_id: Option<&'a str>,
    email: Option<&'a str>,
    first_name: Option<&'a str>,
    last_name: Option<&'a str>,
    login_uri: Option<&'a str>,
    logout_uri: Option<&'a str>,
    surveys: &'a [String],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    demo_user: bool,
}

#[derive(Debug, Serialize)]
struct OkBody {
    ok: bool,
}

/// Current user's status; anonymous callers get nulls
#[tracing::instrument(name = "Get user info", skip(ctx, auth))]
#[get("")]
async fn user_info(ctx: RequestContext, auth: web::Data<AuthSettings>) -> impl Responder {
    let user = ctx.user();

    let body = UserInfoBody {
        accepted_terms_at: user.and_then(|user| user.accepted_terms_at),
        user_id: user.map(|user| user.authorization_id.as_str()),
        email: user.and_then(|user| user.email.as_deref()),
        first_name: user.and_then(|user| user.first_name.as_deref()),
        last_name: user.and_then(|user| user.last_name.as_deref()),
        login_uri: auth.login_uri.as_deref(),
        logout_uri: auth.logout_uri.as_deref(),
        surveys: &[],
        demo_user: user.map_or(false, |user| user.is_demo),
    };

    let mut res = HttpResponse::Ok();
    ctx.update_cookie(&mut res);
    res.json(body)
}

#[tracing::instrument(name = "Accept terms", skip(ctx, store))]
#[post("")]
async fn accept_terms(
    ctx: RequestContext,
    store: web::Data<dyn Store>,
) -> RestResult<impl Responder> {
    let user = ctx.require_user()?;

    store.accept_terms(user.id, Utc::now()).await?;

    let mut res = HttpResponse::Ok();
    ctx.update_cookie(&mut res);
    Ok(res.json(OkBody { ok: true }))
}

pub fn user_info_scope() -> impl HttpServiceFactory {
    web::scope("/user-info").service(user_info)
}

pub fn accept_terms_scope() -> impl HttpServiceFactory {
    web::scope("/accept-terms").service(accept_terms)
}
