pub mod price;
pub mod signal;
