mod hooked_process;

pub use hooked_process::HookedProcess;
