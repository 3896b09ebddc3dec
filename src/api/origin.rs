use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AuthError;

/// The content service behind the gateway.
#[async_trait]
pub trait Origin: Send + Sync + Debug {
    async fn forward(&self, request: Request) -> Result<Response, AuthError>;
}

#[async_trait]
impl<T: Origin + ?Sized> Origin for Arc<T> {
    async fn forward(&self, request: Request) -> Result<Response, AuthError> {
        (**self).forward(request).await
    }
}

#[cfg(target_arch = "wasm32")]
pub use service_binding::ServiceBindingOrigin;

#[cfg(target_arch = "wasm32")]
mod service_binding {
    use super::*;
    use axum::body::Body;

    use crate::config::PROXY_TARGET_BINDING;

    /// Forwards to the worker bound as `PROXY_TARGET`.
    #[derive(Clone)]
    pub struct ServiceBindingOrigin {
        env: worker::Env,
    }

    impl ServiceBindingOrigin {
        pub fn new(env: worker::Env) -> Self {
            Self { env }
        }
    }

    impl Debug for ServiceBindingOrigin {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ServiceBindingOrigin")
                .field("binding", &PROXY_TARGET_BINDING)
                .finish()
        }
    }

    fn origin_error(err: worker::Error) -> AuthError {
        AuthError::Origin(err.to_string())
    }

    #[worker::send]
    async fn fetch_through(env: worker::Env, request: Request) -> Result<Response, AuthError> {
        let worker_request = worker::Request::try_from(request).map_err(origin_error)?;
        let http_request = http::Request::try_from(worker_request).map_err(origin_error)?;

        let proxy_target = env.service(PROXY_TARGET_BINDING).map_err(origin_error)?;
        let response = proxy_target
            .fetch_request(http_request)
            .await
            .map_err(origin_error)?;

        Ok(response.map(Body::new))
    }

    #[async_trait]
    impl Origin for ServiceBindingOrigin {
        async fn forward(&self, request: Request) -> Result<Response, AuthError> {
            fetch_through(self.env.clone(), request).await
        }
    }
}
