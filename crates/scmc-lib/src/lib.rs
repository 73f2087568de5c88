// scmc-lib: myCloud client library and restic REST backend

pub mod cli;
pub mod cloud;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod http_client;
pub mod logger;
pub mod output;
pub mod server;
pub mod signal;
pub mod tui;

#[cfg(test)]
pub(crate) mod testing;
