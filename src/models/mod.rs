pub mod chat;
pub mod post;
