pub mod client;
pub mod notify;
pub mod octopus;
pub mod switch;
