pub mod task;

pub use task::{assemble_server_args, launch, LaunchCommand, ASSETS_FLAG, EARLY_PLUGINS_FLAG};
