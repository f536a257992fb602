//! Middleware pipeline of composable logic wrapped around an outgoing request.
//!
//! Each middleware wraps the next layer, enabling request inspection,
//! short-circuit responses (a cache hit, for example), and response
//! decoration without coupling the transport to those concerns.
//!
//! ## Core types
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining middleware chain; call [`Next::run`] to
//!   advance to the next layer. Once the chain is exhausted the [`Transport`]
//!   performs the actual fetch.
//! - [`MiddlewareHandler`]: type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`]: converts a [`Middleware`] into a [`MiddlewareHandler`].
//! - [`LoggerMiddleware`]: built-in request/response logger.

use std::{future::Future, pin::Pin, sync::Arc};

use thiserror::Error;
use tokio::time::Instant;

use crate::cache::StoreError;
use crate::{Request, Response};

/// Errors that fail a request travelling through the pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failed for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("cache store failed: {0}")]
    Store(#[from] StoreError),

    #[error("refresh failed: {0}")]
    Refresh(String),
}

/// Boxed future produced by every pipeline stage.
pub type PipelineFuture = Pin<Box<dyn Future<Output = Result<Response, FetchError>> + Send>>;

/// The terminal stage of a pipeline: actually sends the request.
///
/// Implemented for any `Fn(Request) -> impl Future<Output = Result<Response, FetchError>>`,
/// so a closure is enough to plug in a real HTTP client or a test double.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> PipelineFuture;
}

impl<F, Fut> Transport for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, FetchError>> + Send + 'static,
{
    fn send(&self, request: Request) -> PipelineFuture {
        Box::pin(self(request))
    }
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is passed to each middleware's [`Middleware::handle`] implementation.
/// Calling [`Next::run`] advances the cursor by one position and invokes the next
/// middleware, or hands the request to the [`Transport`] when the chain is
/// exhausted.
///
/// `Next` is consumed by [`run`](Self::run). It is also `Clone`, which lets a
/// middleware replay the rest of the chain later, as the cache layer does for
/// background refreshes.
#[derive(Clone)]
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    transport: Arc<dyn Transport>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

/// A type-erased, reference-counted middleware function.
///
/// Every entry in the middleware stack is stored as a `MiddlewareHandler`.
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler = Arc<dyn Fn(Request, Next) -> PipelineFuture + Send + Sync + 'static>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |request: Request, next: Next| middleware.handle(request, next))
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given middleware stack.
    ///
    /// # Arguments
    ///
    /// - `middlewares`: the ordered list of handlers that make up the pipeline.
    /// - `transport`: the stage that runs once every handler has delegated.
    pub fn new(middlewares: Vec<MiddlewareHandler>, transport: Arc<dyn Transport>) -> Self {
        Self {
            middlewares,
            transport,
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain and returns its response.
    ///
    /// Advances the internal cursor by one, clones the handler at the current
    /// position, and awaits it. When no handler remains the request goes to
    /// the transport.
    pub async fn run(mut self, request: Request) -> Result<Response, FetchError> {
        if self.index < self.middlewares.len() {
            let handler = self.middlewares[self.index].clone();
            self.index += 1;
            handler(request, self).await
        } else {
            self.transport.send(request).await
        }
    }
}

/// The core trait for all pipeline middleware.
///
/// Implementors receive the [`Request`] and a [`Next`] cursor. They may:
///
/// - **Pass through**: call `next.run(request).await` without modification.
/// - **Short-circuit**: return a [`Response`] directly without calling `next`.
/// - **Decorate**: call `next.run(request).await`, inspect the response, and
///   return a modified copy.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync` because middleware is shared across
///   Tokio tasks.
/// - `handle` **must** return a pinned, `Send` future.
/// - Implementations **should not** hold locks on shared state across an
///   `.await` point.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next middleware.
    fn handle(&self, request: Request, next: Next) -> PipelineFuture;
}

/// Built-in middleware that logs each request's method, URL, status, cache
/// flag, and duration.
///
/// Emits a single `tracing::info!` line after the downstream stage completes,
/// or a `tracing::warn!` line if it failed.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, request: Request, next: Next) -> PipelineFuture {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().as_str().to_string();
            let url = request.href();

            let result = next.run(request).await;
            let duration = start.elapsed();

            match &result {
                Ok(response) => tracing::info!(
                    from_cache = response.is_from_cache(),
                    "{} {} - {} ({:?})",
                    method,
                    url,
                    response.status().as_u16(),
                    duration
                ),
                Err(e) => tracing::warn!(error = %e, "{} {} - failed ({:?})", method, url, duration),
            }

            result
        })
    }
}
