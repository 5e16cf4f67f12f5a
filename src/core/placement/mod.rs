// ─── Artifact placement ───
// Decides which built jar lands in which Server/ subdirectory, under which name.

pub mod bucket;
pub mod placer;

pub use bucket::{Bucket, PlacementRequest};
pub use placer::{unique_file_name, ArtifactPlacer, PlacementResult};
