use anyhow::{bail, Result};
use re4ap_lib::{
    game_version::{detect_version, GameVersion},
    signatures::{HookKind, HookSignature, SignatureSet},
    HookedProcess,
};

pub const GAME_EXE: &str = "bio4.exe";

pub struct Re4 {
    process: HookedProcess,
}

impl Re4 {
    pub fn new_hooked_process(exe_file: &str) -> Result<Self> {
        Ok(Self {
            process: HookedProcess::new(exe_file)?,
        })
    }

    pub fn base_addr(&self) -> usize {
        self.process.base_addr()
    }

    pub fn detect_version(&self, signatures: &SignatureSet) -> Option<GameVersion> {
        detect_version(self.process.image(), signatures)
    }

    /// Image-relative address of the `call` matched by `signature`.
    pub fn call_site_addr(&self, signature: &HookSignature) -> Result<usize> {
        if signature.kind != HookKind::CallSite {
            bail!("{} is not a call site", signature.name);
        }
        Ok(signature.resolve(self.process.image())?)
    }

    pub fn current_callee(&self, addr: usize) -> usize {
        self.process.current_callback_of_hook_call(addr)
    }

    pub fn hook_call(&mut self, addr: usize, target: usize) -> Result<usize> {
        self.process.hook_call(addr, target)
    }

    pub fn function_addr(&self, signature: &HookSignature) -> Result<usize> {
        if signature.kind != HookKind::Function {
            bail!("{} is not a function", signature.name);
        }
        let addr = signature.resolve(self.process.image())?;
        Ok(self.process.raw_ptr(addr) as usize)
    }
}
