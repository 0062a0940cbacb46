pub mod clock;
pub mod factory;
pub mod payment;
pub mod realtime;
pub mod repositories;
