//! # playpen-core
//!
//! Core library for the playpen code playground.
//!
//! A session edits three source fragments (markup, style, script). Running
//! composes them into one document, loads it into an isolated context and
//! collects the console output that context posts back into a log.
//!
//! ```no_run
//! use playpen_core::Playground;
//! use playpen_types::FragmentKind;
//!
//! let mut playground = Playground::with_default_config()?;
//! playground.edit(FragmentKind::Script, r#"console.log("hello")"#);
//! playground.run()?;
//! playground.wait_for_run();
//! assert_eq!(playground.log().latest(), Some("\"hello\""));
//! # Ok::<(), playpen_core::PlaygroundError>(())
//! ```

pub mod bridge;
pub mod config;
pub mod log;
pub mod playground;
pub mod store;

pub use bridge::MessageBridge;
pub use config::{ConfigError, OriginPolicy, PlaygroundConfig};
pub use log::LogStore;
pub use playground::{Phase, Playground, PlaygroundError};
pub use store::SessionState;
