// src/models/mod.rs

pub mod comment;
pub mod post;
pub mod profile;
pub mod tag;
pub mod user;
