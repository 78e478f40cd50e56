// src/services/mod.rs

pub mod certificate;
pub mod identity;
pub mod quiz_service;
