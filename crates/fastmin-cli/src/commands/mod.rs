pub mod minify;
pub mod version;
