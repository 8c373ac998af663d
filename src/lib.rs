pub mod config;
pub mod controller;
pub mod driver;
pub mod meter;
