pub mod codec;
pub mod repository;
pub mod rules;
pub mod service;
