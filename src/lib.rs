pub mod circleci;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod platform;
pub mod scheduler;
pub mod server;
pub mod shutdown;
pub mod webhook;

#[cfg(test)]
mod test_support;
