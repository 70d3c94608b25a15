//! Device interfaces used by the syscall layer
//!
//! All drivers follow these security principles:
//! - Input validation on all public interfaces
//! - No panics on invalid input (return errors)

pub mod console;
pub mod power;

pub use console::Console;
pub use power::Power;
