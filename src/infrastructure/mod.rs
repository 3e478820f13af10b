pub mod alpaca;
pub mod core;
pub mod mock;
pub mod models;
pub mod news;
