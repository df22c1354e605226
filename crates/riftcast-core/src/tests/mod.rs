//! Crate-level scenario tests.
//!
//! - `determinism.rs`: identical inputs give identical arenas and event logs
//! - `integration.rs`: end-to-end casts through `Simulation`
//! - `properties.rs`: proptest checks over requests, charging and rotation
//! - `helpers.rs`: simulation setup, spawners and reusable skills

mod helpers;
