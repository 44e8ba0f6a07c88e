pub mod cron;
pub mod position;
pub mod time;
