//! Logger capability
//!
//! Every lifecycle event (server start/stop, request start/end, middleware
//! count changes, errors) goes through this capability instead of a global
//! console. The default console logger is constructed once at server
//! creation and threaded down by reference; `child` produces a scoped
//! sub-logger for a subsystem (e.g. `server.request`).

use chrono::Local;
use std::sync::Arc;

/// Pluggable logging capability
pub trait Logger: Send + Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
    fn debug(&self, msg: &str);

    /// Create a scoped sub-logger
    fn child(&self, name: &str) -> Arc<dyn Logger>;
}

/// Default console logger: info/debug to stdout, warn/error to stderr
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    scope: String,
    debug_enabled: bool,
}

impl ConsoleLogger {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            debug_enabled: false,
        }
    }

    /// Enable debug-level output (normally gated off)
    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn line(&self, level: &str, msg: &str) -> String {
        format!(
            "[{}] [{level}] [{}] {msg}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            self.scope
        )
    }
}

impl Logger for ConsoleLogger {
    fn info(&self, msg: &str) {
        println!("{}", self.line("INFO", msg));
    }

    fn warn(&self, msg: &str) {
        eprintln!("{}", self.line("WARN", msg));
    }

    fn error(&self, msg: &str) {
        eprintln!("{}", self.line("ERROR", msg));
    }

    fn debug(&self, msg: &str) {
        if self.debug_enabled {
            println!("{}", self.line("DEBUG", msg));
        }
    }

    fn child(&self, name: &str) -> Arc<dyn Logger> {
        Arc::new(Self {
            scope: format!("{}.{name}", self.scope),
            debug_enabled: self.debug_enabled,
        })
    }
}
