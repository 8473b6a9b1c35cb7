//! Output formatting for CLI commands.

pub mod table;

pub use table::{truncate_text, TableFormatter};
