//! # taskhost
//!
//! **Taskhost** is an in-process task runtime for Rust.
//!
//! Plugins (inert configuration values) construct long-running tasks through a
//! shared [`Provider`], resolving their dependencies on each other during
//! construction. The provider then runs every task concurrently until a shared
//! [`CancellationToken`](tokio_util::sync::CancellationToken) fires, relays the
//! events they emit onto one broadcast bus, and reports every task failure once
//! all tasks have exited. A privileged [`Router`] task dispatches HTTP requests
//! to handlers registered by other tasks, and an [`HttpServer`] task serves it
//! on a TCP socket.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ RouterConfig │   │ GatewayConfig│   │  BasicTask   │
//!     │   (plugin)   │   │   (plugin)   │   │   (plugin)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │    get_or_new ◄──┤                  │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Provider                                                         │
//! │  - Registry: name → plugin type, (name, label) → task             │
//! │  - PubSub bus (capacity: ProviderConfig::bus_capacity)            │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ run(ctx)         │                  │
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   execute    │   │   execute    │   │   execute    │
//!     │ task.run(ctx)│   │ task.run(ctx)│   │ task.run(ctx)│
//!     └──────────────┘   └──────────────┘   └──────────────┘
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    relay     │   │    relay     │   │    relay     │
//!     │ task events  │   │ task events  │   │ task events  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 PubSub (fan-out, event.source stamped)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                        sub1     sub2     subN   (Provider::subscribe)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Provider::new()
//!   └─► new_task(ctx, plugin) ... (construction order = dependency order)
//!
//! Provider::run(ctx)
//!   ├─► spawn relay + execute per task (no run-time ordering)
//!   ├─► ctx cancelled ─► tasks return ─► workers exit
//!   ├─► bus.close() ─► every subscriber sees the end of its stream
//!   └─► Ok(()) | Err(RuntimeError::TasksFailed { failures })
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                      |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------|
//! | **Runtime**       | Construct, look up, and run tasks.                            | [`Provider`], [`TaskPlugin`], [`Task`]  |
//! | **Events**        | Key/value events, channels, and fan-out.                      | [`Event`], [`PubSub`], [`Subscription`] |
//! | **Routing**       | Prefix/regex dispatch, cache, named middleware chains.        | [`Router`], [`RouterConfig`]            |
//! | **HTTP serving**  | Serve a router on a socket with a read timeout.               | [`HttpServer`], [`HttpServerConfig`]    |
//! | **Errors**        | Typed errors for construction and execution.                  | [`Error`], [`TaskError`], [`RuntimeError`] |
//! | **Configuration** | Serde-deserializable settings.                                | [`ProviderConfig`]                      |
//! | **Shutdown**      | Cancel on SIGINT/SIGTERM/SIGQUIT.                             | [`cancel_on_signal`]                    |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use http::StatusCode;
//! use tokio_util::sync::CancellationToken;
//! use taskhost::router::{handler_fn, text_response};
//! use taskhost::{BasicTaskConfig, Provider, RouterConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = CancellationToken::new();
//!     let mut provider = Provider::new();
//!
//!     let router = provider.new_task(&ctx, RouterConfig::default())?;
//!     router.add_handler(
//!         "/hello",
//!         None,
//!         handler_fn(|_req| async { text_response(StatusCode::OK, "hello") }),
//!         &[],
//!     )?;
//!     provider.new_task(&ctx, BasicTaskConfig::default())?;
//!
//!     let stop = ctx.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(50)).await;
//!         stop.cancel();
//!     });
//!     provider.run(ctx).await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod identifier;
pub mod router;
mod tasks;

// ---- Public re-exports ----

pub use config::ProviderConfig;
pub use crate::core::Provider;
pub use crate::core::shutdown::{self, cancel_on_signal};
pub use error::{Error, RuntimeError, TaskError, TaskFailure};
pub use events::{Event, EventSender, PubSub, Subscription, channel};
pub use identifier::{RE_IDENTIFIER, is_identifier};
pub use router::{
    Handler, HttpServer, HttpServerConfig, Middleware, RouteParams, Router, RouterConfig,
};
pub use tasks::{BASIC_TASK_NAME, BasicTask, BasicTaskConfig, Task, TaskKey, TaskPlugin, TaskRef};
