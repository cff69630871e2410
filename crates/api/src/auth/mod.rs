//! Bearer token handling.

pub mod jwt;
