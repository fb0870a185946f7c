#[macro_use]
extern crate lazy_static;
extern crate tracing;

pub mod cache;
pub mod cli;
pub mod display;
pub mod health;
pub mod helper;
pub mod logger;
pub mod player;
pub mod probe;
pub mod screenshot;
pub mod server;
pub mod settings;
