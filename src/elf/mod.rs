pub mod constants;
pub mod image;
