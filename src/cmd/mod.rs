pub mod providers;
pub mod resolve;
pub mod serve;
