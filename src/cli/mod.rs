//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, GateArgs, RunArgs, ValidateArgs};

/// Report a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        eprintln!(
            "{}",
            serde_json::json!({ "error": err.to_string(), "causes": chain })
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
