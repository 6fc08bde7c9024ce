//! The filesystem capability injected into native commands via
//! `CommandContext::fs` and into the dispatcher via `Dispatcher::with_fs`.
//! `InMemoryFs` is the only implementation carried here: spec.md's
//! Non-goals exclude a real-disk backend, so there is no overlay/passthrough
//! variant to register alongside it.

pub mod in_memory_fs;
pub mod types;

pub use in_memory_fs::InMemoryFs;
pub use types::*;
