pub mod fetch;
pub mod keys;
pub mod orchestrator;
pub mod upload;

pub use fetch::FetchStage;
pub use orchestrator::BatchUploader;
pub use upload::{UploadStage, UploadTask};
