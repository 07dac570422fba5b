pub mod center;
pub mod cli;
pub mod config;
pub mod fleet;
pub mod keys;
pub mod mutation;
pub mod report;
pub mod session;

pub use center::Center;
pub use config::Config;
pub use fleet::Fleet;
