use std::future::Future;
use std::pin::Pin;

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev, web, FromRequest, HttpRequest, HttpResponseBuilder};

use chrono::Duration;

use crate::crypto::{SigningKey, Token};
use crate::error::{RestError, RestResult};
use crate::repo::{Store, User};
use crate::settings::AuthSettings;

pub const DEMO_LOGIN_HEADER: &str = "X-Demo-Login";
pub const DEMO_LOGIN_COOKIE: &str = "x-demo-login";

const DEMO_SESSION_HOURS: i64 = 12;

/// What the response should do with the demo-login cookie
#[derive(Debug, Clone, PartialEq)]
enum CookieUpdate {
    Keep,
    Set(Token),
    Remove,
}

/// Identity of the caller, resolved once per request
#[derive(Debug)]
pub struct RequestContext {
    user: Option<User>,
    cookie: CookieUpdate,
}

impl RequestContext {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The identified user, or 401
    pub fn require_user(&self) -> RestResult<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| RestError::Unauthorized("Login required".into()))
    }

    /// Write any pending demo-login cookie change onto the response
    pub fn update_cookie(&self, res: &mut HttpResponseBuilder) {
        match &self.cookie {
            CookieUpdate::Keep => {}
            CookieUpdate::Set(token) => {
                let cookie = Cookie::build(DEMO_LOGIN_COOKIE, token.to_string())
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .finish();
                res.cookie(cookie);
            }
            CookieUpdate::Remove => {
                let mut cookie = Cookie::build(DEMO_LOGIN_COOKIE, "").path("/").finish();
                cookie.make_removal();
                res.cookie(cookie);
            }
        }
    }
}

impl FromRequest for RequestContext {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let settings = app_data::<AuthSettings>(&req)?;
            if !settings.demo_login {
                return Ok(Self::anonymous());
            }

            let store = app_data::<dyn Store>(&req)?;
            let signing_key = app_data::<SigningKey>(&req)?;

            let header = req
                .headers()
                .get(DEMO_LOGIN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|uid| !uid.is_empty());

            if let Some(uid) = header {
                return demo_login(store.get_ref(), signing_key.get_ref(), uid).await;
            }

            match req.cookie(DEMO_LOGIN_COOKIE) {
                Some(cookie) => from_cookie(store.get_ref(), signing_key.get_ref(), cookie.value()).await,
                None => Ok(Self::anonymous()),
            }
        })
    }
}

impl RequestContext {
    fn anonymous() -> Self {
        Self {
            user: None,
            cookie: CookieUpdate::Keep,
        }
    }
}

/// Shared state registered at startup in [`crate::app::run`]
fn app_data<T: ?Sized + 'static>(req: &HttpRequest) -> RestResult<web::Data<T>> {
    req.app_data::<web::Data<T>>().cloned().ok_or_else(|| {
        tracing::error!("{} not registered for application", std::any::type_name::<T>());
        RestError::InternalError("Application misconfigured".into())
    })
}

#[tracing::instrument(name = "Demo login", skip(store, signing_key))]
async fn demo_login(
    store: &dyn Store,
    signing_key: &SigningKey,
    uid: &str,
) -> RestResult<RequestContext> {
    let user = match store.upsert_demo_user(uid).await? {
        Some(user) => user,
        None => {
            tracing::warn!("Demo login refused for a regular account");
            return Ok(RequestContext::anonymous());
        }
    };

    let token = Token::issue(
        &user.authorization_id,
        Some(Duration::hours(DEMO_SESSION_HOURS)),
        signing_key,
    )
    .map_err(|e| RestError::InternalError(format!("Failed to sign session: {}", e)))?;

    Ok(RequestContext {
        user: Some(user),
        cookie: CookieUpdate::Set(token),
    })
}

async fn from_cookie(
    store: &dyn Store,
    signing_key: &SigningKey,
    value: &str,
) -> RestResult<RequestContext> {
    let authorization_id = value
        .parse::<Token>()
        .and_then(|token| token.open::<String>(signing_key));

    let user = match authorization_id {
        Ok(authorization_id) => store
            .fetch_user_by_authorization_id(&authorization_id)
            .await?
            .filter(|user| user.is_demo),
        Err(e) => {
            tracing::info!(error = %e, "Ignoring demo-login cookie");
            None
        }
    };

    Ok(match user {
        Some(user) => RequestContext {
            user: Some(user),
            cookie: CookieUpdate::Keep,
        },
        None => RequestContext {
            user: None,
            cookie: CookieUpdate::Remove,
        },
    })
}
