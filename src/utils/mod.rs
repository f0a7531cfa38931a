pub mod duration;
pub mod hardware;
