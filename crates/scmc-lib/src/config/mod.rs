pub mod env;
pub mod file;

pub use env::EnvConfig;
pub use file::{Config, HttpSettings};
