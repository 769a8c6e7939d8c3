use std::fmt;

use sha3::{Digest, Sha3_224};
use tracing::warn;

use crate::{pattern::Pattern, signatures::SignatureSet};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameVersion(String);

impl GameVersion {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Matches the version signatures against the loaded module image, in file order.
pub fn detect_version(image: &[u8], signatures: &SignatureSet) -> Option<GameVersion> {
    signatures.versions.iter().find_map(|version| {
        let pattern = match Pattern::parse(&version.pattern) {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!("invalid version signature {}: {}", version.name, err);
                return None;
            }
        };
        pattern
            .find(image)
            .map(|_| GameVersion(version.name.clone()))
    })
}

pub fn exe_hash(bytes: &[u8]) -> String {
    let hash = Sha3_224::digest(bytes);
    hash.iter().map(|byte| format!("{:02x}", byte)).collect()
}
