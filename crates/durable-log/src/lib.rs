pub mod logger;

pub use logger::DurableLog;
