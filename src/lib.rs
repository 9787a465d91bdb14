pub mod cli;
pub mod config;
pub mod error;
pub mod parse;
pub mod transfer;
pub mod util;

pub use error::FailReason;
pub use error::PullError;
