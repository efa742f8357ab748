//! Test doubles and fixtures for routing without external services

pub mod mocks;

pub use mocks::*;
