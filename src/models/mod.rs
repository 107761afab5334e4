pub mod batch;
pub mod image;
pub mod storage;

pub use batch::*;
pub use image::*;
pub use storage::*;
