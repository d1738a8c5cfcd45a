// Public API for integration tests and the server binary

pub mod arrangement;
pub mod board;
pub mod channel;
pub mod config;
pub mod pool;
pub mod presence;
pub mod protocol;
pub mod puzzle;
pub mod service;
pub mod sweeper;
pub mod team;
pub mod types;
pub mod ws;
