//! Listener registry: receiver identity -> message-type handlers.

mod handlers;
mod listener_registry;

pub use handlers::{HandlerFn, Handlers, Listener};
pub use listener_registry::{DispatchReport, ListenerRegistry};
