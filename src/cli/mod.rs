// CLI module - Command line interface
pub mod args;
pub mod commands;
pub mod output;
pub mod prompt;

pub use args::Args;
pub use commands::{execute_command, report_failure};
pub use output::{ConfigSummary, ConsoleWriter};
pub use prompt::ConsoleOperator;
