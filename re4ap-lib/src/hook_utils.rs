use std::{fs, path::PathBuf};

use anyhow::{bail, Result};
use windows::{
    core::{HSTRING, PCWSTR},
    Win32::{
        Foundation::{HMODULE, HWND, MAX_PATH},
        System::LibraryLoader::GetModuleFileNameW,
        UI::WindowsAndMessaging::{MessageBoxW, MB_ICONWARNING, MB_OK},
    },
};

use crate::game_version::exe_hash;

pub fn show_warn_dialog(msg: &str) {
    unsafe {
        MessageBoxW(
            HWND::default(),
            &HSTRING::from(msg),
            &HSTRING::from("re4ap"),
            MB_ICONWARNING | MB_OK,
        )
    };
}

/// Path of `module`, or of the executable when `module` is `None`.
pub fn module_file_path(module: Option<HMODULE>) -> Result<PathBuf> {
    let mut buf = [0u16; MAX_PATH as usize];
    if unsafe { GetModuleFileNameW(module.unwrap_or_default(), &mut buf) } == 0 {
        bail!("GetModuleFileNameW failed");
    }
    let path = unsafe { PCWSTR::from_raw(buf.as_ptr()).to_string() }?;
    Ok(PathBuf::from(path))
}

pub fn current_exe_hash() -> Result<String> {
    let exe_file_path = module_file_path(None)?;
    Ok(exe_hash(&fs::read(exe_file_path)?))
}
