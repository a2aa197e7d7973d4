pub mod payment;
pub mod product;
pub mod user;
pub mod webhook_log;
pub mod wishlist_item;
