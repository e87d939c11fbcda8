pub mod forecast;
pub mod health;
