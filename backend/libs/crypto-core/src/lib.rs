//! Token primitives shared by the help desk services.

pub mod jwt;
