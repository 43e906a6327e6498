pub mod archive;
pub mod checksum;
pub mod fetch;
pub mod fs;
pub mod logger;
pub mod signature;
pub mod spinner;
pub mod version;
