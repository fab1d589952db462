pub mod auth;
pub mod chat;
pub mod company;
pub mod notification;
pub mod order;
pub mod otp;
pub mod payment;
pub mod profile;

mod router;
pub use router::get_router;
