//! Minimal terminal UI runtime.
//!
//! Renders only when something changed: once at startup and after each
//! terminal event. There is no tick; the loop blocks on input.

mod app;
mod event;
mod event_loop;
mod runner;

pub use self::{app::App, runner::Tui};
