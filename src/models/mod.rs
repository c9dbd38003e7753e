pub mod daily_entry;
pub mod user;
pub mod weekly_stats;
