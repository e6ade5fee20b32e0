//! Server lifecycle
//!
//! Owns the listen/close/restart state machine around one accept loop.
//! Middleware and the route handler are registered on the server and live
//! behind a lock; each request executes against a snapshot, so registration
//! while the server is running is safe and affects the next request, never
//! an in-flight one.

mod connection;
mod listener;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::logger::{ConsoleLogger, Logger};
use crate::pipeline::{Middleware, Pipeline, RouteHandler};
use connection::SharedState;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// HTTP server driving a middleware [`Pipeline`]
pub struct Server {
    shared: Arc<SharedState>,
    handle: Option<ListenerHandle>,
}

struct ListenerHandle {
    addr: SocketAddr,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Server {
    /// Create a server with a console logger scoped to `server`; debug
    /// output follows the configured log level
    pub fn new(config: ServerConfig) -> Self {
        let debug = config.log_level == "debug";
        Self::with_logger(config, Arc::new(ConsoleLogger::new("server").with_debug(debug)))
    }

    pub fn with_logger(config: ServerConfig, logger: Arc<dyn Logger>) -> Self {
        let pipeline = Pipeline::with_logger(logger.child("pipeline"));
        Self {
            shared: Arc::new(SharedState {
                config,
                pipeline: RwLock::new(pipeline),
                connections: AtomicUsize::new(0),
                logger,
            }),
            handle: None,
        }
    }

    /// Register one middleware; takes effect from the next request
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) -> &Self {
        self.shared
            .pipeline
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pipe(middleware);
        self
    }

    /// Register several middlewares in order
    pub fn use_middlewares(&self, middlewares: Vec<Arc<dyn Middleware>>) -> &Self {
        self.shared
            .pipeline
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .through(middlewares);
        self
    }

    /// Set the terminal route handler
    pub fn set_route_handler(&self, handler: Arc<dyn RouteHandler>) -> &Self {
        self.shared
            .pipeline
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .terminal(handler);
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.shared
            .pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .count()
    }

    /// Snapshot of the registered middleware handlers
    pub fn middlewares(&self) -> Vec<Arc<dyn Middleware>> {
        self.shared
            .pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .middlewares()
    }

    pub fn get_config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Connections currently being served
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Address the accept loop is bound to, when running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().map(|h| h.addr)
    }

    /// Bind and start accepting connections.
    ///
    /// Returns the bound address (useful with port 0). Calling `listen` on a
    /// server that is already running is an error, not a rebind.
    pub async fn listen(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(handle) = &self.handle {
            return Err(ServerError::AlreadyRunning(handle.addr));
        }

        let addr = self.shared.config.socket_addr()?;
        let tcp = listener::bind_reusable(addr)?;
        let addr = tcp.local_addr()?;

        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(accept_loop(
            tcp,
            Arc::clone(&self.shared),
            Arc::clone(&shutdown),
        ));

        self.shared.logger.info(&format!("listening on http://{addr}"));
        self.handle = Some(ListenerHandle {
            addr,
            shutdown,
            task,
        });
        Ok(addr)
    }

    /// Stop accepting connections.
    ///
    /// Connections already being served run to completion on their own
    /// tasks; only the accept loop is torn down here.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        let handle = self.handle.take().ok_or(ServerError::NotRunning)?;
        handle.shutdown.notify_one();
        if handle.task.await.is_err() {
            self.shared.logger.warn("accept loop ended abnormally");
        }
        self.shared
            .logger
            .info(&format!("stopped listening on {}", handle.addr));
        Ok(())
    }

    /// Close and listen again with the current configuration.
    ///
    /// Middleware, the route handler and active connections all survive the
    /// restart; only the listener is replaced.
    pub async fn restart(&mut self) -> Result<SocketAddr, ServerError> {
        self.shared.logger.info("restarting");
        self.close().await?;
        self.listen().await
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<SharedState>, shutdown: Arc<Notify>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    shared.logger.debug(&format!("accepted connection from {peer_addr}"));
                    connection::accept_connection(stream, peer_addr, &shared);
                }
                Err(err) => {
                    shared.logger.error(&format!("accept failed: {err}"));
                }
            },
            () = shutdown.notified() => break,
        }
    }
}
