/// Bearer Authentication Middleware
///
/// Reads the `Authorization` header, runs it through `RequestAuthenticator`
/// and stores the resulting `Caller` in the request extensions. Handlers take
/// it with `web::ReqData<Caller>`.
///
/// No header means `Caller::Anonymous`. A header that is present but not a
/// valid bearer access token ends the request with 401.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{parse_bearer, Caller, RequestAuthenticator};
use crate::error::{AppError, AuthError};

pub struct BearerAuth {
    authenticator: RequestAuthenticator,
}

impl BearerAuth {
    pub fn new(authenticator: RequestAuthenticator) -> Self {
        Self { authenticator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(BearerAuthService {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
    authenticator: RequestAuthenticator,
}

impl<S> BearerAuthService<S> {
    fn caller_for(&self, req: &ServiceRequest) -> Result<Caller, AuthError> {
        let header = match req.headers().get(AUTHORIZATION) {
            None => return self.authenticator.authenticate_request(None),
            Some(header) => header,
        };

        let token = header
            .to_str()
            .ok()
            .and_then(parse_bearer)
            .ok_or_else(|| {
                tracing::warn!(path = %req.path(), "Malformed Authorization header");
                AuthError::Unauthorized
            })?;

        self.authenticator.authenticate_request(Some(token))
    }
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.caller_for(&req) {
            Ok(caller) => {
                if let Some(identity) = caller.identity() {
                    tracing::debug!(
                        user_id = %identity.user_id,
                        username = %identity.username,
                        "Bearer token validated"
                    );
                }
                req.extensions_mut().insert(caller);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => Box::pin(async move { Err(AppError::Auth(e).into()) }),
        }
    }
}
