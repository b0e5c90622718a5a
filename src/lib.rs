pub mod common;
pub mod driver;
