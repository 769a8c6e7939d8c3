use std::{fs, io, path::Path};

pub const STEAM_APP_ID: &str = "254700";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_COMMIT: &str = env!("RE4AP_GIT_COMMIT");
pub const GIT_BRANCH: &str = env!("RE4AP_GIT_BRANCH");

pub fn short_commit() -> &'static str {
    GIT_COMMIT.get(..8).unwrap_or(GIT_COMMIT)
}

/// Writes `steam_appid.txt` next to `bio4.exe` when it is missing.
pub fn ensure_steam_appid(dir: &Path) -> io::Result<bool> {
    let appid_path = dir.join("steam_appid.txt");
    if appid_path.exists() || !dir.join("bio4.exe").exists() {
        return Ok(false);
    }
    fs::write(appid_path, STEAM_APP_ID)?;
    Ok(true)
}

/// The HD Project replaces door sounds, so their presence identifies it.
pub fn detect_hd_project(game_dir: &Path) -> bool {
    let Some(install_dir) = game_dir.parent() else {
        return false;
    };
    let snd_dir = install_dir.join("BIO4").join("snd");
    snd_dir.join("doorse012.xsb").exists() && snd_dir.join("doorse012.xwb").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_steam_appid_only_next_to_game() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!ensure_steam_appid(dir.path()).unwrap());
        assert!(!dir.path().join("steam_appid.txt").exists());

        fs::write(dir.path().join("bio4.exe"), b"MZ").unwrap();
        assert!(ensure_steam_appid(dir.path()).unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join("steam_appid.txt")).unwrap(),
            "254700"
        );

        fs::write(dir.path().join("steam_appid.txt"), "custom").unwrap();
        assert!(!ensure_steam_appid(dir.path()).unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join("steam_appid.txt")).unwrap(),
            "custom"
        );
    }

    #[test]
    fn detects_hd_project_sound_files() {
        let install = tempfile::tempdir().unwrap();
        let game_dir = install.path().join("Bin32");
        let snd_dir = install.path().join("BIO4").join("snd");
        fs::create_dir_all(&game_dir).unwrap();
        fs::create_dir_all(&snd_dir).unwrap();
        assert!(!detect_hd_project(&game_dir));

        fs::write(snd_dir.join("doorse012.xsb"), b"").unwrap();
        assert!(!detect_hd_project(&game_dir));
        fs::write(snd_dir.join("doorse012.xwb"), b"").unwrap();
        assert!(detect_hd_project(&game_dir));
    }

    #[test]
    fn short_commit_is_at_most_eight_chars() {
        assert!(short_commit().len() <= 8);
    }
}
