pub mod notifications;
pub mod payments;
pub mod sites;
pub mod users;
pub mod wishlist;
