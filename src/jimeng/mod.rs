pub mod client;
pub mod models;
pub mod tools;

pub use client::ImageClient;
pub use models::ImageModel;
pub use tools::{ImageTools, ToolDescriptor, ToolOutput};
