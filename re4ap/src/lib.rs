#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

mod auto_updater;
mod bridge_worker;
#[cfg(target_os = "windows")]
mod console;
#[cfg(target_os = "windows")]
mod exception_handler;
mod game_link;
#[cfg(target_os = "windows")]
mod hooks;
mod input;
#[cfg(target_os = "windows")]
mod input_hook;
#[cfg(target_os = "windows")]
mod re4;
mod settings;
mod startup;
#[cfg(target_os = "windows")]
mod tracing_helper;
#[cfg(target_os = "windows")]
mod wrappers;

#[cfg(target_os = "windows")]
mod dll_main {
    use std::{
        path::{Path, PathBuf},
        sync::Arc,
    };

    use anyhow::{anyhow, Result};
    use re4ap_lib::{
        bridge::Bridge,
        hook_utils::{current_exe_hash, module_file_path, show_warn_dialog},
        signatures::SignatureSet,
        version::AppVersion,
    };
    use tracing::{debug, error, info, warn};
    use windows::Win32::{
        Foundation::{HINSTANCE, HMODULE},
        System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH},
    };

    use crate::{
        auto_updater, bridge_worker, console, exception_handler,
        game_link::GameLink,
        hooks,
        input::{hotkey_watcher, HotkeyAction, KeyMap, RemapTable},
        input_hook,
        re4::{Re4, GAME_EXE},
        settings::{read_connection, Settings, SettingsRepo},
        startup, tracing_helper, wrappers,
    };

    fn bridge_dir(settings: &Settings, dll_dir: &Path) -> PathBuf {
        if settings.bridge_directory.trim().is_empty() {
            dll_dir.to_path_buf()
        } else {
            PathBuf::from(settings.bridge_directory.trim())
        }
    }

    fn init_input(module: HINSTANCE, settings: &Settings, bridge: Bridge) {
        let key_map = KeyMap::new();
        let watcher = hotkey_watcher(&key_map, &settings.hotkeys);
        let remaps = RemapTable::parse(
            &key_map,
            settings
                .remaps
                .iter()
                .map(|(from, to)| (from.as_str(), to.as_str())),
        )
        .unwrap_or_else(|err| {
            warn!("key remapping disabled: {}", err);
            RemapTable::default()
        });
        let fallback = settings.clone();
        input_hook::init(module, watcher, remaps, move |action| match action {
            HotkeyAction::ToggleConsole => {
                if let Err(err) = console::toggle() {
                    warn!("failed to toggle console: {}", err);
                }
            }
            HotkeyAction::ReloadConfig => {
                let connection = read_connection(&fallback, &bridge);
                info!("connection: {} on {}", connection.slot, connection.server);
            }
        });
    }

    fn init_main(module: HINSTANCE) -> Result<()> {
        let dll_path = module_file_path(Some(HMODULE(module.0)))?;
        let dll_dir = dll_path
            .parent()
            .ok_or_else(|| anyhow!("no parent: {}", dll_path.display()))?;
        let dll_stem = dll_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dinput8".to_owned());

        let settings_repo = SettingsRepo::new(dll_dir.join(format!("{}.toml", dll_stem)));
        let settings = settings_repo.load();
        let console_opened = settings.console_enabled && console::open().is_ok();
        tracing_helper::init_tracing(dll_dir, &format!("{}.log", dll_stem), console_opened);
        info!("Big ironic thanks to QLOC S.A.");

        let signatures =
            SignatureSet::load_or_builtin(dll_dir.join(format!("{}.signatures.json", dll_stem)))?;
        let mut re4 = Re4::new_hooked_process(GAME_EXE)?;
        exception_handler::set_game_base_addr(re4.base_addr());
        let Some(version) = re4.detect_version(&signatures) else {
            error!("unsupported game version");
            show_warn_dialog("re4ap: unsupported game version, the mod is disabled.");
            return Ok(());
        };

        match startup::ensure_steam_appid(&std::env::current_dir()?) {
            Ok(true) => info!("created steam_appid.txt"),
            Ok(false) => {}
            Err(err) => warn!("failed to create steam_appid.txt: {}", err),
        }

        let exe_path = module_file_path(None)?;
        let root_dir = exe_path.parent().unwrap_or(dll_dir);
        info!(
            "Starting re4ap v{}-{}-{}",
            startup::VERSION,
            startup::short_commit(),
            startup::GIT_BRANCH
        );
        info!(
            "Process: {} (pid {})",
            exe_path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default(),
            std::process::id()
        );
        info!("Running from: \"{}\"", root_dir.display());
        info!("Game version: {}", version);
        match current_exe_hash() {
            Ok(hash) => info!("exe hash: {}", hash),
            Err(err) => debug!("exe hash unavailable: {}", err),
        }

        if startup::detect_hd_project(root_dir) {
            info!("RE4 HD Project detected");
        }

        let bridge = Bridge::new(bridge_dir(&settings, dll_dir));
        init_input(module, &settings, bridge.clone());

        let connection = read_connection(&settings, &bridge);
        if connection.slot.is_empty() {
            warn!("no Archipelago slot configured");
        } else {
            info!("Archipelago slot {} on {}", connection.slot, connection.server);
        }

        let link = Arc::new(GameLink::default());
        hooks::install(&mut re4, &signatures, link.clone());
        bridge_worker::spawn(bridge, link);

        if settings.updater_enabled && !settings.releases_url.trim().is_empty() {
            let current = AppVersion::parse(startup::VERSION)?;
            auto_updater::spawn_check(settings.releases_url.trim().to_owned(), current);
        }
        Ok(())
    }

    #[no_mangle]
    pub extern "system" fn DllMain(inst_dll: HINSTANCE, reason: u32, _reserved: u32) -> bool {
        match reason {
            DLL_PROCESS_ATTACH => {
                if let Err(err) = wrappers::init() {
                    show_warn_dialog(&format!("re4ap: failed to load dinput8.dll: {}", err));
                }
                exception_handler::install();
                if let Err(err) = init_main(inst_dll) {
                    error!("initialization failed: {:?}", err);
                }
            }
            DLL_PROCESS_DETACH => wrappers::release(),
            _ => {}
        }
        true
    }
}
