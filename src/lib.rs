pub mod config;
pub mod content_type;
pub mod error;
pub mod jimeng;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod storage;

pub use config::{CosConfig, JimengConfig, LoggingConfig, PipelineConfig};
pub use error::{BridgeError, ErrorInfo, ErrorKind, Result};
pub use jimeng::{ImageClient, ImageModel, ImageTools, ToolDescriptor, ToolOutput};
pub use models::*;
pub use pipeline::BatchUploader;
pub use server::ToolServer;
pub use storage::{BlobStore, BlobStoreClient, CosBlobStore, MemoryBlobStore};
