pub mod resolver;

pub use resolver::{resolve_server_version, ServerVersion};
