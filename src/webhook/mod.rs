pub mod events;
pub mod handler;
pub mod normalize;
pub mod signature;
