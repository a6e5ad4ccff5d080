//! Application services layer.

pub mod admin;
pub mod content;
pub mod error;
pub mod images;
pub mod mail;
pub mod repos;
pub mod submissions;
pub mod writer;
