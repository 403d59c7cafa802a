pub mod error;
pub mod image;

pub use error::{FatshellError, Result};
pub use image::Image;
