pub mod addon;
pub mod source;
