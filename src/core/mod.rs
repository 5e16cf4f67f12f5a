// ─── hytale-run Core ───
// Provisioning and launch pipeline for a locally built Hytale server mod.
//
// Architecture:
//   core/
//     config/     — RunConfiguration (hytale-run.json) + placement plan
//     archive/    — Zip extraction (single entry / whole archive)
//     downloader/ — HTTP download of the downloader archive + platform binary choice
//     process/    — Subprocess helpers, tee'd output capture
//     version/    — Server version resolution via hytale-downloader
//     placement/  — Buckets + collision-free jar placement
//     pipeline/   — Cache layout + staged provisioning
//     launch/     — Server argument assembly + foreground launch
//     java/       — Java binary lookup

pub mod archive;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod pipeline;
pub mod placement;
pub mod process;
pub mod version;
