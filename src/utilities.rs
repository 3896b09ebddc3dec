use std::future::Future;
use std::time::Duration;

pub struct Utilities;

impl Utilities {
    pub fn get_session_storage_key(subject: &str) -> String {
        format!("session::{}", subject)
    }

    pub fn get_jwks_url(domain: &str) -> String {
        format!("{}/.well-known/jwks.json", domain)
    }
}

/// The wrapped future did not finish within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

//
// On wasm32, define a newtype that wraps a future and unsafely marks it as Send.
// Workers run every request on a single thread, so the future never moves.
//
#[cfg(target_arch = "wasm32")]
mod non_send {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    pub struct NonSendFuture<F>(pub F);

    impl<F: Future> Future for NonSendFuture<F> {
        type Output = F::Output;
        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            // SAFETY: the inner future is structurally pinned and never moved out.
            unsafe { self.map_unchecked_mut(|s| &mut s.0) }.poll(cx)
        }
    }

    // SAFETY: wasm32-unknown-unknown workers are single-threaded.
    unsafe impl<F> Send for NonSendFuture<F> {}
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn assert_send<F: Future>(f: F) -> impl Future<Output = F::Output> + Send {
    non_send::NonSendFuture(f)
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn assert_send<F: Future + Send>(f: F) -> impl Future<Output = F::Output> + Send {
    f
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) async fn with_timeout<F: Future>(limit: Duration, fut: F) -> Result<F::Output, Elapsed> {
    tokio::time::timeout(limit, fut).await.map_err(|_| Elapsed)
}

#[cfg(target_arch = "wasm32")]
pub(crate) async fn with_timeout<F: Future>(limit: Duration, fut: F) -> Result<F::Output, Elapsed> {
    use futures::future::{select, Either};

    let fut = std::pin::pin!(fut);
    let delay = std::pin::pin!(worker::Delay::from(limit));
    match select(fut, delay).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(_) => Err(Elapsed),
    }
}
