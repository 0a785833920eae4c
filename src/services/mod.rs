// src/services/mod.rs

pub mod comments;
pub mod policy;
pub mod posts;
pub mod tags;
