pub mod api;
pub mod embed;
#[cfg(test)]
pub mod mock;
pub mod rate_limit;
pub mod server;
pub mod verify;
