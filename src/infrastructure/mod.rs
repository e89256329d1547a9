//! Ambient infrastructure shared by all four worker binaries:
//! configuration, logging, SQLite pooling, and the common HTTP surface.

pub mod config;
pub mod db;
pub mod http;
pub mod logging;
