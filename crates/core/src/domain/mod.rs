pub mod discount;
pub mod price;
pub mod quote;
