pub mod bridge;
pub mod game_version;
#[cfg(target_os = "windows")]
pub mod hook_utils;
pub mod locations;
#[cfg(target_os = "windows")]
mod memory_accessors;
pub mod pattern;
pub mod signatures;
pub mod version;

#[cfg(target_os = "windows")]
pub use crate::memory_accessors::HookedProcess;
