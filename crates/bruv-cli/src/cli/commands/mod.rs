//! Command handlers.

pub mod helpers;
pub mod list;
pub mod queries;
pub mod read;
pub mod shell;

pub use list::run_list;
pub use queries::{run_pipeline, run_queries};
pub use read::{run_read, run_state, run_unread};
pub use shell::run_shell;
