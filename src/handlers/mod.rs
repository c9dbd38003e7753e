pub mod health;
pub mod moods;
pub mod profile;
pub mod recommendations;
pub mod stats;
pub mod users;
