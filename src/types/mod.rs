pub mod decision;
pub mod order;
pub mod position;
pub mod quote;
pub mod trade;
