pub mod common;
pub mod patch;
pub mod run;
pub mod types;
