use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::services::auth_service;

/// Rejects the request with the standard error envelope.
fn unauthorized(message: &str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "success": false,
        "message": message,
        "errors": [message]
    }));
    actix_web::error::InternalError::from_response(message.to_string(), response).into()
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth_header = req.headers().get("Authorization");

        let token = match auth_header.and_then(|value| value.to_str().ok()) {
            Some(header_str) if header_str.starts_with("Bearer ") => {
                header_str[7..].trim().to_string()
            }
            Some(_) => {
                return Box::pin(async move {
                    Err(unauthorized("Invalid Authorization header format"))
                });
            }
            None => {
                return Box::pin(async move { Err(unauthorized("Missing authorization token")) });
            }
        };

        match auth_service::verify_token(&token) {
            Ok(claims) => {
                // Handlers read the verified claims via web::ReqData<Claims>
                req.extensions_mut().insert(claims);

                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(e) => {
                log::debug!("🔒 Rejected token: {}", e);
                Box::pin(async move { Err(unauthorized("Invalid or expired token")) })
            }
        }
    }
}
