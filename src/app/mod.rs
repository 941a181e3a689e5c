pub mod engagement;
pub mod error;
pub mod feed;
pub mod list;
pub mod optimistic;
