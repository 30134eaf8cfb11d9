pub mod health;
pub mod indexes;
pub mod ready;
