pub mod engagement;
pub mod feed;
pub mod session;
pub mod tweet;
