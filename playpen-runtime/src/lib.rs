//! Playpen Runtime - isolated execution of composed documents
//!
//! This crate runs a composed document away from the host and carries the
//! page's messages back. It includes:
//!
//! - **Sandbox**: loads a document on a fresh worker thread with a fresh
//!   script engine, tearing down the previous page
//! - **Engine**: the boa-backed script context and the browser globals it
//!   exposes (`window`, `console`, timers, `document`)
//! - **Host**: the message target the page posts to, the single listener
//!   subscription and the per-run outbound port
//! - **Page**: splits a document into script blocks and its rendered view
//!
//! ## Isolation
//!
//! A page shares no memory with the host. The only capability it holds is a
//! [`HostPort`], which can post a JSON value stamped with the page's
//! [`RunId`](playpen_types::RunId). Everything else the page does stays inside
//! its own engine and is discarded on the next load.
//!
//! ## Example
//!
//! ```rust,no_run
//! use playpen_runtime::{MessageTarget, RuntimeLimits, Sandbox};
//! use playpen_types::ComposedDocument;
//!
//! let target = MessageTarget::new();
//! let mut listener = target.subscribe().unwrap();
//! let mut sandbox = Sandbox::new(target, RuntimeLimits::default());
//!
//! let doc = ComposedDocument::new(
//!     "<body><script>window.parent.postMessage({ type: 'console', data: ['hi'] }, '*')</script></body>",
//! );
//! sandbox.load(&doc).unwrap();
//! sandbox.wait();
//!
//! let envelope = listener.try_recv().unwrap();
//! assert_eq!(envelope.data["data"][0], "hi");
//! ```
//!
//! ## Limits
//!
//! Every page runs under [`RuntimeLimits`]:
//!
//! - Script block size (default: 1MB)
//! - Loop iterations and recursion depth per evaluation
//! - Bracket nesting per script block (default: 128 levels)
//! - Timer callbacks fired after load (default: 1000)
//! - Longest accepted timer delay (default: 60 seconds)

pub mod abi;
pub mod engine;
pub mod host;
pub mod page;
pub mod sandbox;
pub mod timers;

pub use abi::{RuntimeError, RuntimeLimits, RuntimeResult};

pub use engine::ScriptEngine;

pub use host::{CancelToken, HostPort, MessageTarget, Subscription};

pub use page::{Page, RenderedPage};

pub use sandbox::Sandbox;

pub use timers::{TimerEntry, TimerQueue};
