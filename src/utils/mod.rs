// src/utils/mod.rs

pub mod client_ip;
pub mod csv;
pub mod hash;
pub mod html;
pub mod json;
pub mod jwt;
