pub mod content;
pub mod download;
pub mod package;
