// Compose projects: discovery, manifest path translation and the CLI runner.

pub mod cache;
pub mod manifest;
pub mod runner;
pub mod scanner;
pub mod translate;

pub use cache::ScanCache;
pub use manifest::{MANIFEST_FILES, Manifest, ServiceDecl};
pub use runner::{ComposeCommand, ComposeOutcome, ComposeRun, ComposeRunner, filter_env};
pub use scanner::{
    DiscoveredProject, aggregate_status, build_project, discover, discover_one, find_manifest,
    validate_project_name,
};
pub use translate::{PathTranslator, TranslatedManifest, preprocess};
