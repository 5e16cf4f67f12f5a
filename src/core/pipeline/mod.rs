pub mod layout;
pub mod provision;

pub use layout::CacheLayout;
pub use provision::{PreparedServer, ProvisioningPipeline};
