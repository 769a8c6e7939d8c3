use std::{fmt, str::FromStr};

/// Release version such as `1.0.0.0` or a tag such as `v1.2`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AppVersion([u32; 4]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid version '{0}'")]
pub struct InvalidVersion(String);

impl AppVersion {
    pub fn parse(text: &str) -> Result<Self, InvalidVersion> {
        let invalid = || InvalidVersion(text.to_owned());
        let trimmed = text.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let parts = trimmed
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid());
        }
        let mut numbers = [0; 4];
        numbers[..parts.len()].copy_from_slice(&parts);
        Ok(Self(numbers))
    }
}

impl FromStr for AppVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, build, revision] = self.0;
        write!(f, "{}.{}.{}.{}", major, minor, build, revision)
    }
}
