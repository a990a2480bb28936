// lib.rs - Library exports for the server binary and integration tests

pub mod bootstrap;
pub mod chain;
pub mod config;
pub mod engine;
pub mod errors;
pub mod math;
pub mod models;
pub mod web;
