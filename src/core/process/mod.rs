pub mod exec;
pub mod tee;

pub use exec::{format_command_for_logs, program_name, run_captured, run_with_passthrough};
pub use tee::{SharedBuffer, TeeWriter};
