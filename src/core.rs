pub mod account;
pub mod cost;
pub mod decision;
pub mod error;
#[cfg(test)]
pub mod fakes;
pub mod rates;
pub mod source;
pub mod switch;
pub mod tariff;
