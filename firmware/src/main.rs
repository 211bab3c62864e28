#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
extern crate panic_halt;

#[cfg(target_os = "none")]
mod hw;
#[cfg_attr(not(target_os = "none"), allow(dead_code))]
mod telemetry;
#[cfg_attr(not(target_os = "none"), allow(dead_code))]
mod tick;

#[cfg(target_os = "none")]
mod runtime;

#[cfg(not(target_os = "none"))]
fn main() {}
