pub mod cleanup_scheduler;

pub use cleanup_scheduler::start_cleanup_scheduler;
