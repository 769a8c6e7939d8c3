use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::error;
use windows::Win32::System::Diagnostics::Debug::{
    SetUnhandledExceptionFilter, EXCEPTION_POINTERS,
};

const EXCEPTION_CONTINUE_SEARCH: i32 = 0;

static GAME_BASE_ADDR: AtomicUsize = AtomicUsize::new(0);

/// Lets crash reports carry game-relative addresses once the game module is known.
pub fn set_game_base_addr(base_addr: usize) {
    GAME_BASE_ADDR.store(base_addr, Ordering::Relaxed);
}

unsafe extern "system" fn on_unhandled_exception(info: *const EXCEPTION_POINTERS) -> i32 {
    let Some(record) = info.as_ref().and_then(|info| info.ExceptionRecord.as_ref()) else {
        return EXCEPTION_CONTINUE_SEARCH;
    };
    let addr = record.ExceptionAddress as usize;
    let base_addr = GAME_BASE_ADDR.load(Ordering::Relaxed);
    if base_addr != 0 && addr >= base_addr {
        error!(
            "unhandled exception {:#010x} at {:#x} (bio4.exe+{:#x})",
            record.ExceptionCode.0,
            addr,
            addr - base_addr
        );
    } else {
        error!(
            "unhandled exception {:#010x} at {:#x}",
            record.ExceptionCode.0, addr
        );
    }
    EXCEPTION_CONTINUE_SEARCH
}

pub fn install() {
    unsafe { SetUnhandledExceptionFilter(Some(on_unhandled_exception)) };
}
