//! Middleware chain execution.
//!
//! # Responsibilities
//! - Run handlers in order; each decides whether to call `next`
//! - Always end the chain with the application's terminal handler
//! - Funnel every error or panic of one request into one boundary
//!
//! # Design Decisions
//! - Handlers are async; a handler may await before calling `next`
//! - Not calling `next` halts the chain; the handler owns the response
//! - The boundary is the chain future itself (`catch_unwind`), not each handler

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::SoyaError;
use crate::http::error_handler::ErrorHandler;
use crate::http::exchange::Exchange;

/// One request-handling step.
pub trait Middleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn handle<'a>(&'a self, exchange: &'a mut Exchange, next: Next<'a>) -> BoxFuture<'a, Result<(), SoyaError>>;
}

/// The rest of the chain after the current handler.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    /// Run the remaining handlers.
    pub async fn run(self, exchange: &mut Exchange) -> Result<(), SoyaError> {
        match self.rest.split_first() {
            Some((head, rest)) => {
                tracing::trace!(middleware = head.name(), "Entering middleware");
                head.handle(exchange, Next { rest }).await
            }
            None => Ok(()),
        }
    }

    /// Number of handlers still to run.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// Ordered handlers plus the terminal handler and the error boundary.
pub struct MiddlewareChain {
    handlers: Vec<Arc<dyn Middleware>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl MiddlewareChain {
    /// Build a chain; `terminal` always runs last.
    pub fn new(
        mut handlers: Vec<Arc<dyn Middleware>>,
        terminal: Arc<dyn Middleware>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        handlers.push(terminal);
        Self {
            handlers,
            error_handler,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the chain for one exchange. Errors never escape; they are handed
    /// to the error handler exactly once.
    pub async fn execute(&self, exchange: &mut Exchange) {
        let started = Instant::now();
        let chain = Next {
            rest: &self.handlers,
        };

        let outcome = AssertUnwindSafe(chain.run(exchange)).catch_unwind().await;
        let error = match outcome {
            Ok(Ok(())) => {
                tracing::debug!(
                    request_id = %exchange.request_id(),
                    status = exchange.response.status().as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request handled"
                );
                return;
            }
            Ok(Err(err)) => err,
            Err(panic) => SoyaError::Panic(panic_message(panic)),
        };

        self.report(error, exchange);
    }

    fn report(&self, error: SoyaError, exchange: &mut Exchange) {
        let Exchange {
            request, response, ..
        } = exchange;

        if response.headers_sent() {
            self.error_handler.response_sent_error(&error, request, response);
        } else {
            self.error_handler.response_not_sent_error(&error, request, response);
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
