//! HTTP request/response abstraction with an onion-model middleware pipeline.
//!
//! The crate is built around five pieces:
//! - [`http::request::IncomingRequest`] - parsed, queryable view of one inbound request
//! - [`http::response::OutgoingResponse`] - accumulated outbound state, finalized once
//! - [`http::context::RequestContext`] - one request + one response per connection
//! - [`pipeline::Pipeline`] - ordered middleware chain around a terminal route handler
//! - [`server::Server`] - listen/accept lifecycle and per-request error translation
//!
//! Routing, TLS, and body-parsing internals are collaborator concerns and are
//! intentionally not implemented here.

pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod pipeline;
pub mod server;

pub use config::{ServerConfig, SslConfig};
pub use error::{HandlerError, HandlerResult, ServerError};
pub use http::context::RequestContext;
pub use http::request::{ConnectionInfo, FileUpload, IncomingRequest};
pub use http::response::{Body, OutgoingResponse};
pub use logger::{ConsoleLogger, Logger};
pub use pipeline::{
    BoxFuture, Middleware, MiddlewareFn, Next, Pipeline, RouteHandler, RouteHandlerFn,
};
pub use server::Server;
