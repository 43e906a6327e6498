pub mod addon;
pub mod bootstrap;
pub mod commands;
pub mod dialog;
pub mod environment;
pub mod settings;
pub mod store;
