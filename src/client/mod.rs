//! Pipeline client with an ordered middleware stack in front of a transport.

use std::sync::Arc;

use tracing::debug;

use crate::middleware::{FetchError, Middleware, MiddlewareHandler, Next, Transport, from_middleware};
use crate::{Request, Response};

/// Runs requests through a middleware stack and, unless a middleware answers
/// first, the transport.
///
/// Middleware runs in the order it was added: the first one added sees the
/// request first and the response last.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_cache::{Client, Request, Response, StatusCode};
/// use rttp_cache::middleware::{FetchError, LoggerMiddleware};
///
/// # async fn run() -> Result<(), FetchError> {
/// let client = Client::new(|request: Request| async move {
///     Ok::<_, FetchError>(Response::new(StatusCode::OK).url(request.href()))
/// })
/// .with_middleware(LoggerMiddleware);
///
/// let response = client.execute(Request::get("http://www.example.com/")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    middlewares: Vec<MiddlewareHandler>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a client with an empty middleware stack.
    pub fn new<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            middlewares: Vec::new(),
            transport: Arc::new(transport),
        }
    }

    /// Appends a middleware to the stack.
    #[must_use]
    pub fn with_middleware<M>(self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.with_handler(from_middleware(Arc::new(middleware)))
    }

    /// Appends an already type-erased handler to the stack.
    #[must_use]
    pub fn with_handler(mut self, handler: MiddlewareHandler) -> Self {
        self.middlewares.push(handler);
        self
    }

    /// Number of middleware layers in front of the transport.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if requests go straight to the transport.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Sends one request through the pipeline.
    ///
    /// # Returns
    ///
    /// The response produced by the first stage that answers, which is the
    /// transport unless a middleware short-circuits.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] raised by a middleware or the transport.
    pub async fn execute(&self, request: Request) -> Result<Response, FetchError> {
        debug!(method = %request.method(), url = %request.href(), "dispatching request");
        Next::new(self.middlewares.clone(), Arc::clone(&self.transport))
            .run(request)
            .await
    }
}
