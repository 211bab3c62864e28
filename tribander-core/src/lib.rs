#![no_std]

// Control logic for the Tribander relay band switch.
//
// Everything here is portable: the firmware wires it to GPIO and the SysTick
// counter, the emulator wires it to a simulated button and a host-side tick.

pub mod bands;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod pulse;
pub mod telemetry;
pub mod ticks;
