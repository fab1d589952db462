pub mod clock;
pub mod database;
pub mod extract;
pub mod response;
pub mod validation;
