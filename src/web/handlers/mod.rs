//! # Web API Request Handlers

pub mod health;
