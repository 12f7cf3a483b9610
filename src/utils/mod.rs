// Utility functions
pub mod cache;
pub mod error;
pub mod otp;
pub mod thread_pool;

pub use cache::*;
pub use error::*;
pub use otp::*;
pub use thread_pool::*;
