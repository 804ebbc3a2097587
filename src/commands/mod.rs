// ABOUTME: Command module aggregator for the registry-gc CLI.
// ABOUTME: Re-exports gc, list, and serve command handlers.

mod connect;
mod gc;
mod list;
mod serve;

pub use gc::{apply_gc_overrides, gc};
pub use list::list;
pub use serve::serve;
