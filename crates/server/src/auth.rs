//! HTTP Basic auth guard (§6: "if configured, every route except
//! `/health` requires HTTP Basic auth"). The middleware is only mounted
//! at all when [`ServerConfig::auth_enabled`] is true: `BasicAuth`'s
//! extractor itself 401s on a missing `Authorization` header before any
//! validator runs, so wrapping it unconditionally would 401 credential-less
//! requests even with auth disabled.

use std::sync::Arc;

use actix_web::dev::ServiceRequest;
use actix_web::Error as ActixError;
use actix_web_httpauth::extractors::basic::BasicAuth;
use actix_web_httpauth::extractors::AuthenticationError;
use actix_web_httpauth::headers::www_authenticate::basic::Basic;
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::config::ServerConfig;

type ValidatorOutput = Result<ServiceRequest, (ActixError, ServiceRequest)>;
type ValidatorFut = std::pin::Pin<Box<dyn std::future::Future<Output = ValidatorOutput> + 'static>>;

pub fn middleware(cfg: Arc<ServerConfig>) -> HttpAuthentication<BasicAuth, impl Fn(ServiceRequest, BasicAuth) -> ValidatorFut + Clone> {
    HttpAuthentication::basic(move |req, credentials| {
        let cfg = cfg.clone();
        Box::pin(async move { validate(req, credentials, &cfg) }) as ValidatorFut
    })
}

fn validate(req: ServiceRequest, credentials: BasicAuth, cfg: &ServerConfig) -> ValidatorOutput {
    let user_ok = credentials.user_id() == cfg.username.as_str();
    let pass_ok = credentials.password().unwrap_or("") == cfg.password.as_str();
    if user_ok && pass_ok {
        Ok(req)
    } else {
        let err = AuthenticationError::new(Basic::with_realm("oas"));
        Err((err.into(), req))
    }
}
