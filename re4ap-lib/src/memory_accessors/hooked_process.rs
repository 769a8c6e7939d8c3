use std::{
    ffi::c_void,
    mem::size_of,
    ptr::{read_unaligned, write_unaligned},
    slice,
};

use anyhow::{bail, Result};
use windows::{
    core::HSTRING,
    Win32::System::{
        LibraryLoader::GetModuleHandleW,
        Memory::{VirtualProtect, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS},
        ProcessStatus::{GetModuleInformation, MODULEINFO},
        Threading::GetCurrentProcess,
    },
};

const CALL_REL32: u8 = 0xe8;
const CALL_REL32_LEN: usize = 5;

fn module_info(module_name: &str) -> Result<MODULEINFO> {
    let module = unsafe { GetModuleHandleW(&HSTRING::from(module_name)) }?;
    let mut module_info: MODULEINFO = Default::default();
    unsafe {
        GetModuleInformation(
            GetCurrentProcess(),
            module,
            &mut module_info,
            size_of::<MODULEINFO>() as u32,
        )
    }?;
    Ok(module_info)
}

unsafe fn assemble_call_target(addr: *mut u8, target: usize) -> usize {
    let call_base_addr = addr.wrapping_add(CALL_REL32_LEN) as i64;
    let p_call_target = addr.wrapping_add(1) as *mut i32;
    let old_value = read_unaligned(p_call_target);
    write_unaligned(p_call_target, (target as i64 - call_base_addr) as i32);
    (call_base_addr + old_value as i64) as usize
}

fn call_target(addr: *const u8) -> usize {
    let call_base_addr = addr.wrapping_add(CALL_REL32_LEN) as i64;
    let p_call_target = addr.wrapping_add(1) as *const i32;
    let value = unsafe { read_unaligned(p_call_target) };
    (call_base_addr + value as i64) as usize
}

/// The module this DLL was loaded into. Addresses are relative to the module base.
pub struct HookedProcess {
    base_addr: usize,
    image_size: usize,
}

impl HookedProcess {
    pub fn new(exe_file: &str) -> Result<Self> {
        let module_info = module_info(exe_file)?;
        Ok(Self {
            base_addr: module_info.lpBaseOfDll as usize,
            image_size: module_info.SizeOfImage as usize,
        })
    }

    pub fn base_addr(&self) -> usize {
        self.base_addr
    }

    pub fn image(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.base_addr as *const u8, self.image_size) }
    }

    pub fn raw_ptr(&self, addr: usize) -> *const c_void {
        (self.base_addr + addr) as *const c_void
    }

    fn virtual_protect(
        &mut self,
        addr: usize,
        size: usize,
        protect: PAGE_PROTECTION_FLAGS,
    ) -> Result<PAGE_PROTECTION_FLAGS> {
        let mut old: PAGE_PROTECTION_FLAGS = Default::default();
        unsafe { VirtualProtect((self.base_addr + addr) as _, size, protect, &mut old) }?;
        Ok(old)
    }

    /// Redirects the `call rel32` at `addr` to `target` and returns the previous callee.
    pub fn hook_call(&mut self, addr: usize, target: usize) -> Result<usize> {
        if addr
            .checked_add(CALL_REL32_LEN)
            .map_or(true, |end| end > self.image_size)
        {
            bail!("call site {:#x} is outside the image", addr);
        }
        let p_call = (self.base_addr + addr) as *mut u8;
        if unsafe { *p_call } != CALL_REL32 {
            bail!("no call instruction at {:#x}", addr);
        }
        let old = self.virtual_protect(addr, CALL_REL32_LEN, PAGE_EXECUTE_READWRITE)?;
        let original = unsafe { assemble_call_target(p_call, target) };
        self.virtual_protect(addr, CALL_REL32_LEN, old)?;
        Ok(original)
    }

    pub fn current_callback_of_hook_call(&self, addr: usize) -> usize {
        call_target((self.base_addr + addr) as *const u8)
    }
}
