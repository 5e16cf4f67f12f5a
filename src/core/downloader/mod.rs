pub mod client;
pub mod platform;

pub use client::Downloader;
pub use platform::{current_platform, select_for_os, DownloaderBinary};
