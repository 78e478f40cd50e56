// src/models/mod.rs

pub mod admin;
pub mod attempt;
pub mod question;
pub mod session;
