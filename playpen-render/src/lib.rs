//! # playpen-render
//!
//! Turns the three source fragments into a single executable document.
//!
//! Composition is pure string building with Askama: the style fragment goes
//! into the head, the markup fragment into the body, followed by the console
//! interceptor and finally the user script wrapped in a guard.

pub mod compose;
pub mod interceptor;

pub use compose::{compose, compose_fragments, guard_script, ComposeError};
pub use interceptor::INTERCEPTOR_SOURCE;
