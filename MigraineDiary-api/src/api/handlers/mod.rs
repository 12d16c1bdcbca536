pub mod account;
pub mod assessments;
pub mod consents;
pub mod cron;
pub mod entries;
pub mod health;
pub mod medications;
pub mod reminders;
pub mod reports;
pub mod shares;
pub mod statistics;
pub mod weather;

pub use health::health_check;
