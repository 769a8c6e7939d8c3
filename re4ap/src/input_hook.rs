use std::{
    mem::size_of,
    sync::OnceLock,
    thread,
    time::Duration,
};

use tracing::{error, info};
use windows::Win32::{
    Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
    UI::{
        Input::KeyboardAndMouse::{
            GetAsyncKeyState, MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD,
            KEYBDINPUT, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE,
            MAPVK_VK_TO_VSC, VIRTUAL_KEY,
        },
        WindowsAndMessaging::{
            CallNextHookEx, DispatchMessageW, GetMessageW, SetWindowsHookExW,
            TranslateMessage, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, LLKHF_INJECTED, MSG,
            WH_KEYBOARD_LL, WM_KEYUP, WM_SYSKEYUP,
        },
    },
};

use crate::input::{is_extended_key, HotkeyAction, HotkeyWatcher, RemapTable};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

static REMAPS: OnceLock<RemapTable> = OnceLock::new();

fn is_down(code: u16) -> bool {
    (unsafe { GetAsyncKeyState(code as i32) } as u16 & 0x8000) != 0
}

/// Injects by scan code, which is what DirectInput reads.
fn send_key(code: u16, up: bool) {
    let scan = unsafe { MapVirtualKeyW(code as u32, MAPVK_VK_TO_VSC) } as u16;
    let mut flags = KEYEVENTF_SCANCODE;
    if is_extended_key(code) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    if up {
        flags |= KEYEVENTF_KEYUP;
    }
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    unsafe { SendInput(&[input], size_of::<INPUT>() as i32) };
}

unsafe extern "system" fn low_level_keyboard_proc(
    code: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if code == HC_ACTION as i32 {
        let event = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
        let injected = (event.flags & LLKHF_INJECTED).0 != 0;
        let target = REMAPS
            .get()
            .and_then(|remaps| remaps.translate(event.vkCode as u16));
        if let (false, Some(target)) = (injected, target) {
            let up = matches!(wparam.0 as u32, WM_KEYUP | WM_SYSKEYUP);
            send_key(target, up);
            return LRESULT(1);
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

fn start_remapping(module: HINSTANCE, remaps: RemapTable) {
    let count = remaps.len();
    if REMAPS.set(remaps).is_err() {
        return;
    }
    let module = module.0 as usize;
    thread::spawn(move || {
        let module = HINSTANCE(module as _);
        let hook = unsafe {
            SetWindowsHookExW(WH_KEYBOARD_LL, Some(low_level_keyboard_proc), module, 0)
        };
        if let Err(err) = hook {
            error!("failed to install keyboard hook: {}", err);
            return;
        }
        info!("{} key remap(s) active", count);
        let mut msg = MSG::default();
        while unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) }.as_bool() {
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    });
}

fn start_hotkeys(mut watcher: HotkeyWatcher, on_action: impl Fn(HotkeyAction) + Send + 'static) {
    thread::spawn(move || loop {
        for action in watcher.poll(is_down) {
            on_action(action);
        }
        thread::sleep(POLL_INTERVAL);
    });
}

pub fn init(
    module: HINSTANCE,
    watcher: HotkeyWatcher,
    remaps: RemapTable,
    on_action: impl Fn(HotkeyAction) + Send + 'static,
) {
    if !watcher.is_empty() {
        start_hotkeys(watcher, on_action);
    }
    if !remaps.is_empty() {
        start_remapping(module, remaps);
    }
}
