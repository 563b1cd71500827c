//! Background tasks module
//!
//! This module contains the tasks that run alongside the timer: the display
//! refresh loop and the listener for other contexts' states.

pub mod display_loop;
pub mod sync_listener;

// Re-export main functions
pub use display_loop::{display_loop_task, DisplayFrame, Visibility};
pub use sync_listener::sync_listener_task;
