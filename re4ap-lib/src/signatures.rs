use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::pattern::{Pattern, PatternError};

const BUILTIN_SIGNATURES: &str = include_str!("../assets/signatures.json");

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("failed to read signatures: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse signatures: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{name}: {source}")]
    Pattern {
        name: String,
        #[source]
        source: PatternError,
    },
    #[error("{0}: pattern not found")]
    NotFound(String),
    #[error("{name}: pattern is ambiguous ({count} matches)")]
    Ambiguous { name: String, count: usize },
    #[error("{name}: offset {offset:#x} points outside the image")]
    OutOfRange { name: String, offset: usize },
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VersionSignature {
    pub name: String,
    pub pattern: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// `call rel32` whose destination is redirected.
    CallSite,
    /// Entry point of a game function.
    Function,
}

impl HookKind {
    /// Bytes that must lie inside the image at the resolved address.
    pub fn patched_len(self) -> usize {
        match self {
            HookKind::CallSite => 5,
            HookKind::Function => 1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct HookSignature {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub offset: usize,
    pub kind: HookKind,
}

impl HookSignature {
    pub fn pattern(&self) -> Result<Pattern, SignatureError> {
        Pattern::parse(&self.pattern).map_err(|source| SignatureError::Pattern {
            name: self.name.clone(),
            source,
        })
    }

    /// Returns the image-relative address of the unique match plus `offset`,
    /// which must leave room for the hooked instruction inside `image`.
    pub fn resolve(&self, image: &[u8]) -> Result<usize, SignatureError> {
        let pattern = self.pattern()?;
        let matches: Vec<_> = pattern.find_all(image).take(2).collect();
        match matches.as_slice() {
            [] => Err(SignatureError::NotFound(self.name.clone())),
            [addr] => addr
                .checked_add(self.offset)
                .filter(|addr| {
                    addr.checked_add(self.kind.patched_len())
                        .is_some_and(|end| end <= image.len())
                })
                .ok_or_else(|| SignatureError::OutOfRange {
                    name: self.name.clone(),
                    offset: self.offset,
                }),
            _ => Err(SignatureError::Ambiguous {
                name: self.name.clone(),
                count: pattern.find_all(image).count(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignatureSet {
    #[serde(default)]
    pub versions: Vec<VersionSignature>,
    #[serde(default)]
    pub hooks: Vec<HookSignature>,
}

impl SignatureSet {
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_SIGNATURES).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, SignatureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SignatureError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Loads `path` if it exists, otherwise the set shipped with the mod.
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Result<Self, SignatureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::builtin());
        }
        Self::load(path)
    }

    pub fn hook(&self, name: &str) -> Option<&HookSignature> {
        self.hooks
            .iter()
            .find(|hook| hook.name.eq_ignore_ascii_case(name))
    }
}
