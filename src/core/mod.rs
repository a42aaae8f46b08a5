//! Runtime core: construction, registry, and concurrent execution.
//!
//! The only public types from this module are [`Provider`], which builds and
//! runs tasks, and the [`shutdown`] helpers that tie cancellation to OS signals.
//!
//! ## Wiring
//! ```text
//! plugin ──new_task──► Provider ──► Registry ((name, label) → task)
//!                         │
//!                       run(ctx)
//!                         ├─► runner::execute (per task) ──► Option<TaskFailure>
//!                         └─► runner::relay   (per task) ──► task events ──► bus ──► subscribers
//!
//! shutdown::cancel_on_signal(ctx) ── SIGINT/SIGTERM/SIGQUIT ──► ctx.cancel()
//! ```
//!
//! Internal modules:
//! - [`registry`]: name → plugin type binding, `(name, label)` → task;
//! - [`runner`]: per-task execute and relay workers;
//! - [`provider`]: the public facade over both;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod provider;
mod registry;
mod runner;
pub mod shutdown;

pub use provider::Provider;
