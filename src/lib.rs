// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod import;
pub mod remote;
pub mod session;
pub mod sync;
pub mod team;
pub mod wake_lock;
