pub mod cart_item;
pub mod document;
pub mod price_rule;
pub mod user;
