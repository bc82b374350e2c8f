pub mod host;
pub mod protocol;
pub mod target;
