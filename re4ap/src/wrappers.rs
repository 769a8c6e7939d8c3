use std::{
    ffi::c_void,
    mem::transmute,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::Result;
use windows::{
    core::{s, GUID, HRESULT, HSTRING, PCSTR, PCWSTR},
    Win32::{
        Foundation::{FreeLibrary, E_FAIL, HINSTANCE, HMODULE, MAX_PATH, S_FALSE},
        System::{
            LibraryLoader::{GetProcAddress, LoadLibraryW},
            SystemInformation::GetSystemDirectoryW,
        },
    },
};

static ORIGINAL_MODULE: AtomicUsize = AtomicUsize::new(0);
static ORIGINAL_DIRECT_INPUT_8_CREATE: AtomicUsize = AtomicUsize::new(0);
static ORIGINAL_DLL_CAN_UNLOAD_NOW: AtomicUsize = AtomicUsize::new(0);
static ORIGINAL_DLL_GET_CLASS_OBJECT: AtomicUsize = AtomicUsize::new(0);
static ORIGINAL_DLL_REGISTER_SERVER: AtomicUsize = AtomicUsize::new(0);
static ORIGINAL_DLL_UNREGISTER_SERVER: AtomicUsize = AtomicUsize::new(0);

fn load_system_library(dll_name: &str) -> Result<HMODULE> {
    let system_directory = unsafe {
        let mut buf = [0u16; MAX_PATH as usize];
        GetSystemDirectoryW(Some(&mut buf));
        PCWSTR::from_raw(buf.as_ptr()).to_string()?
    };
    let dll_path = format!("{}\\{}", system_directory, dll_name);
    Ok(unsafe { LoadLibraryW(&HSTRING::from(dll_path)) }?)
}

fn resolve(module: HMODULE, name: PCSTR, slot: &AtomicUsize) {
    if let Some(func) = unsafe { GetProcAddress(module, name) } {
        slot.store(func as usize, Ordering::Relaxed);
    }
}

/// Loads the real `dinput8.dll` from the system directory and remembers its exports.
pub fn init() -> Result<()> {
    let module = load_system_library("dinput8.dll")?;
    ORIGINAL_MODULE.store(module.0 as usize, Ordering::Relaxed);
    resolve(module, s!("DirectInput8Create"), &ORIGINAL_DIRECT_INPUT_8_CREATE);
    resolve(module, s!("DllCanUnloadNow"), &ORIGINAL_DLL_CAN_UNLOAD_NOW);
    resolve(module, s!("DllGetClassObject"), &ORIGINAL_DLL_GET_CLASS_OBJECT);
    resolve(module, s!("DllRegisterServer"), &ORIGINAL_DLL_REGISTER_SERVER);
    resolve(module, s!("DllUnregisterServer"), &ORIGINAL_DLL_UNREGISTER_SERVER);
    Ok(())
}

pub fn release() {
    let module = ORIGINAL_MODULE.swap(0, Ordering::Relaxed);
    if module != 0 {
        let _ = unsafe { FreeLibrary(HMODULE(module as _)) };
    }
}

fn original(slot: &AtomicUsize) -> Option<usize> {
    Some(slot.load(Ordering::Relaxed)).filter(|&addr| addr != 0)
}

#[no_mangle]
extern "system" fn DirectInput8Create(
    hinst: HINSTANCE,
    version: u32,
    riidltf: *const GUID,
    ppvout: *mut *mut c_void,
    punkouter: *mut c_void,
) -> HRESULT {
    type Func = extern "system" fn(
        HINSTANCE,
        u32,
        *const GUID,
        *mut *mut c_void,
        *mut c_void,
    ) -> HRESULT;
    let Some(addr) = original(&ORIGINAL_DIRECT_INPUT_8_CREATE) else {
        return E_FAIL;
    };
    let func: Func = unsafe { transmute(addr) };
    func(hinst, version, riidltf, ppvout, punkouter)
}

#[no_mangle]
extern "system" fn DllCanUnloadNow() -> HRESULT {
    type Func = extern "system" fn() -> HRESULT;
    let Some(addr) = original(&ORIGINAL_DLL_CAN_UNLOAD_NOW) else {
        return S_FALSE;
    };
    let func: Func = unsafe { transmute(addr) };
    func()
}

#[no_mangle]
extern "system" fn DllGetClassObject(
    rclsid: *const GUID,
    riid: *const GUID,
    ppv: *mut *mut c_void,
) -> HRESULT {
    type Func = extern "system" fn(*const GUID, *const GUID, *mut *mut c_void) -> HRESULT;
    let Some(addr) = original(&ORIGINAL_DLL_GET_CLASS_OBJECT) else {
        return E_FAIL;
    };
    let func: Func = unsafe { transmute(addr) };
    func(rclsid, riid, ppv)
}

#[no_mangle]
extern "system" fn DllRegisterServer() -> HRESULT {
    type Func = extern "system" fn() -> HRESULT;
    let Some(addr) = original(&ORIGINAL_DLL_REGISTER_SERVER) else {
        return E_FAIL;
    };
    let func: Func = unsafe { transmute(addr) };
    func()
}

#[no_mangle]
extern "system" fn DllUnregisterServer() -> HRESULT {
    type Func = extern "system" fn() -> HRESULT;
    let Some(addr) = original(&ORIGINAL_DLL_UNREGISTER_SERVER) else {
        return E_FAIL;
    };
    let func: Func = unsafe { transmute(addr) };
    func()
}
