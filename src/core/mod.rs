pub mod admission;
pub mod channel;
pub mod manager;
pub mod notify;
pub mod processor;
pub mod scheduler;

pub use admission::BidAdmission;
pub use channel::{DelayQueue, InProcessDelayQueue};
pub use manager::AuctionHouse;
pub use notify::{LogNotifier, Notifier};
pub use processor::{ClosingProcessor, ProcessorConfig};
pub use scheduler::ClosingScheduler;
