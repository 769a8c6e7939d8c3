use re4ap_lib::version::AppVersion;
use serde::Deserialize;

/// Subset of the GitHub "latest release" response.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub html_url: String,
}

pub fn newer_release(current: &AppVersion, release: &Release) -> Option<AppVersion> {
    let latest = AppVersion::parse(&release.tag_name).ok()?;
    (latest > *current).then_some(latest)
}

#[cfg(target_os = "windows")]
mod check {
    use anyhow::Result;
    use re4ap_lib::{hook_utils::show_warn_dialog, version::AppVersion};
    use tracing::{error, info, warn};

    use super::{newer_release, Release};

    async fn fetch_latest(url: &str) -> Result<Release> {
        let release = reqwest::Client::new()
            .get(url)
            .header(reqwest::header::USER_AGENT, concat!("re4ap/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(release)
    }

    pub fn spawn_check(url: String, current: AppVersion) {
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("updater runtime: {}", err);
                    return;
                }
            };
            let release = match runtime.block_on(fetch_latest(&url)) {
                Ok(release) => release,
                Err(err) => {
                    warn!("update check failed: {}", err);
                    return;
                }
            };
            match newer_release(&current, &release) {
                Some(latest) => {
                    warn!("update available: {} -> {} {}", current, latest, release.html_url);
                    show_warn_dialog(&format!(
                        "A new version of re4ap is available: {}\n{}",
                        latest, release.html_url
                    ));
                }
                None => info!("re4ap is up to date ({})", current),
            }
        });
    }
}

#[cfg(target_os = "windows")]
pub use check::spawn_check;

#[cfg(test)]
mod tests {
    use super::*;

    fn release(tag: &str) -> Release {
        serde_json::from_str(&format!(
            r#"{{"tag_name": "{}", "html_url": "https://example.invalid/r", "assets": []}}"#,
            tag
        ))
        .unwrap()
    }

    #[test]
    fn reports_only_newer_releases() {
        let current = AppVersion::parse("1.0.0").unwrap();
        assert_eq!(
            newer_release(&current, &release("v1.1.0")),
            Some(AppVersion::parse("1.1").unwrap())
        );
        assert_eq!(newer_release(&current, &release("v1.0.0.0")), None);
        assert_eq!(newer_release(&current, &release("v0.9")), None);
        assert_eq!(newer_release(&current, &release("nightly")), None);
    }
}
