pub mod film;
pub mod logger;
