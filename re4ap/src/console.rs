use anyhow::Result;
use tracing::debug;
use windows::{
    core::HSTRING,
    Win32::{
        System::Console::{AllocConsole, GetConsoleWindow, SetConsoleTitleW},
        UI::WindowsAndMessaging::{IsWindowVisible, ShowWindow, SW_HIDE, SW_SHOW},
    },
};

pub fn open() -> Result<()> {
    unsafe { AllocConsole() }?;
    unsafe { SetConsoleTitleW(&HSTRING::from(concat!("re4ap ", env!("CARGO_PKG_VERSION")))) }?;
    Ok(())
}

pub fn toggle() -> Result<()> {
    let window = unsafe { GetConsoleWindow() };
    if window.is_invalid() {
        return open();
    }
    let visible = unsafe { IsWindowVisible(window) }.as_bool();
    debug!("console visible: {}", !visible);
    let _ = unsafe { ShowWindow(window, if visible { SW_HIDE } else { SW_SHOW }) };
    Ok(())
}
