#![no_std]

// Control core for the thermal-printer alarm clock.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library. Every hardware or network touchpoint is a trait
// the embedding target implements; the core itself performs no I/O.

pub mod clock;
pub mod controller;
pub mod engine;
pub mod escalate;
pub mod sequence;
pub mod store;
pub mod telemetry;
pub mod wire;
