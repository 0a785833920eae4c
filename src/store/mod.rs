// src/store/mod.rs
//
// Persistence for each entity. Functions take `&mut SqliteConnection` so they
// compose inside a caller's transaction (`&mut *tx`) or on a pooled
// connection alike.

pub mod comments;
pub mod posts;
pub mod profiles;
pub mod tags;
pub mod users;
