//! Motion and mechanism control for holonomic competition robots on no-std
//! platforms.
//!
//! Everything lives under [`utils`]: cooperative actions and their
//! scheduler, mechanism state machines, mecanum odometry, trajectory
//! following and input edge detection. Hardware is reached only through the
//! traits in [`utils::hal`]; see `holo-app/sim-bot` for a host-side loop.
#![no_std]

extern crate alloc;

pub mod utils;
