pub mod repository;
pub mod stock;
