//! Middleware pipeline
//!
//! Ordered middleware handlers around one terminal route handler, executed
//! with onion-model continuation semantics: handlers run in registration
//! order on the way in, and code placed after the continuation call runs in
//! reverse order on the way out. A middleware that drops its continuation
//! stops everything downstream, terminal handler included.
//!
//! The continuation ([`Next`]) is consumed by value when run, so a handler
//! cannot invoke it twice; execution snapshots the handler list up front, so
//! registering more middleware never affects an in-flight run.

use crate::error::HandlerResult;
use crate::http::context::RequestContext;
use crate::logger::{ConsoleLogger, Logger};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future used by middleware and route handler trait objects
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One composable unit of request-handling logic.
///
/// A middleware may read and mutate the shared context, perform async work,
/// and delegate to the rest of the chain by running `next`. Work placed
/// after `next.run(..).await` executes during the unwind, after every
/// downstream stage has completed.
pub trait Middleware: Send + Sync {
    /// Name used in pipeline logs
    fn name(&self) -> &str {
        "middleware"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult<()>>;
}

/// Terminal stage of the pipeline, conventionally an application router.
///
/// A returned value is sent as a JSON body by the server when the response
/// is still unsent after the pipeline completes.
pub trait RouteHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult<Option<Value>>>;
}

/// Continuation handed to each middleware.
///
/// Consumed by value: delegating twice is a compile error, which closes the
/// re-entrancy hole a shared-cursor design would leave open.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    terminal: Option<&'a dyn RouteHandler>,
}

impl<'a> Next<'a> {
    /// Run the next stage: the following middleware if one remains, else the
    /// terminal handler. Dropping `Next` without running it short-circuits
    /// the rest of the chain.
    pub fn run<'b>(self, ctx: &'b mut RequestContext) -> BoxFuture<'b, HandlerResult<()>>
    where
        'a: 'b,
    {
        match self.rest.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    rest,
                    terminal: self.terminal,
                };
                current.handle(ctx, next)
            }
            None => {
                let terminal = self.terminal;
                Box::pin(async move {
                    if let Some(handler) = terminal {
                        // A middleware that already finalized the response
                        // owns the reply; the terminal handler is skipped
                        if !ctx.response.has_responded() {
                            let value = handler.handle(&mut *ctx).await?;
                            if ctx.result.is_none() && !ctx.response.has_responded() {
                                ctx.result = value;
                            }
                        }
                    }
                    Ok(())
                })
            }
        }
    }
}

/// Ordered middleware chain plus one optional terminal handler
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
    terminal: Option<Arc<dyn RouteHandler>>,
    logger: Arc<dyn Logger>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_logger(Arc::new(ConsoleLogger::new("pipeline")))
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            middlewares: Vec::new(),
            terminal: None,
            logger,
        }
    }

    /// Append one middleware
    pub fn pipe(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self.logger.debug(&format!(
            "middleware added, total: {}",
            self.middlewares.len()
        ));
        self
    }

    /// Append several middlewares in order
    pub fn through(&mut self, middlewares: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.logger.debug(&format!(
            "adding {} middleware(s), total: {}",
            middlewares.len(),
            self.middlewares.len() + middlewares.len()
        ));
        self.middlewares.extend(middlewares);
        self
    }

    /// Set the terminal route handler
    pub fn terminal(&mut self, handler: Arc<dyn RouteHandler>) -> &mut Self {
        self.terminal = Some(handler);
        self
    }

    pub fn count(&self) -> usize {
        self.middlewares.len()
    }

    /// Registered middleware names, in order
    pub fn middleware_names(&self) -> Vec<String> {
        self.middlewares
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Snapshot of the registered middleware handlers
    pub fn middlewares(&self) -> Vec<Arc<dyn Middleware>> {
        self.middlewares.clone()
    }

    /// Execute the chain against one request context.
    ///
    /// The handler list is snapshotted before the first stage runs;
    /// registration during execution only affects later executions. The
    /// terminal handler runs exactly once when the chain fully delegates,
    /// and never when a middleware short-circuits.
    pub async fn execute(&self, ctx: &mut RequestContext) -> HandlerResult<()> {
        let logger = self.logger.child("execution");
        logger.debug(&format!(
            "starting: {} middleware(s), {} {}",
            self.middlewares.len(),
            ctx.request.method,
            ctx.request.path
        ));

        let snapshot = self.middlewares.clone();
        let next = Next {
            rest: &snapshot,
            terminal: self.terminal.as_deref(),
        };

        match next.run(ctx).await {
            Ok(()) => {
                logger.debug("completed");
                Ok(())
            }
            Err(err) => {
                logger.error(&format!("execution failed: {err}"));
                Err(err)
            }
        }
    }
}

/// Adapter turning a closure into a [`Middleware`]
pub struct MiddlewareFn<F> {
    name: String,
    func: F,
}

impl<F> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, HandlerResult<()>>
        + Send
        + Sync,
{
    pub fn new(name: &str, func: F) -> Self {
        Self {
            name: name.to_string(),
            func,
        }
    }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, HandlerResult<()>>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult<()>> {
        (self.func)(ctx, next)
    }
}

/// Adapter turning a closure into a [`RouteHandler`]
pub struct RouteHandlerFn<F> {
    func: F,
}

impl<F> RouteHandlerFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult<Option<Value>>>
        + Send
        + Sync,
{
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> RouteHandler for RouteHandlerFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult<Option<Value>>>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult<Option<Value>>> {
        (self.func)(ctx)
    }
}
