use std::{fmt, str::FromStr};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,
    #[error("invalid pattern token '{0}'")]
    InvalidToken(String),
}

/// Byte pattern with wildcards, written as `"8B 0D ?? ?? ?? ?? E8"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern(Vec<Option<u8>>);

impl Pattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let bytes = pattern
            .split_whitespace()
            .map(|token| match token {
                "?" | "??" => Ok(None),
                _ if token.len() == 2 && token.bytes().all(|b| b.is_ascii_hexdigit()) => {
                    u8::from_str_radix(token, 16)
                        .map(Some)
                        .map_err(|_| PatternError::InvalidToken(token.to_owned()))
                }
                _ => Err(PatternError::InvalidToken(token.to_owned())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if bytes.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self(bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn matches_at(&self, haystack: &[u8], start: usize) -> bool {
        self.0
            .iter()
            .zip(&haystack[start..])
            .all(|(expected, actual)| expected.map_or(true, |byte| byte == *actual))
    }

    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        self.find_all(haystack).next()
    }

    pub fn find_all<'a>(&'a self, haystack: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
        let last = haystack.len().checked_sub(self.len());
        last.into_iter()
            .flat_map(|last| 0..=last)
            .filter(move |&start| self.matches_at(haystack, start))
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .0
            .iter()
            .map(|byte| match byte {
                Some(value) => format!("{:02X}", value),
                None => "??".to_owned(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wildcards() {
        let pattern = Pattern::parse("8b 0D ? ?? ff").unwrap();
        assert_eq!(pattern.len(), 5);
        assert_eq!(pattern.to_string(), "8B 0D ?? ?? FF");
    }

    #[test]
    fn rejects_bad_tokens() {
        assert_eq!(Pattern::parse("   "), Err(PatternError::Empty));
        assert_eq!(
            Pattern::parse("8B ZZ"),
            Err(PatternError::InvalidToken("ZZ".to_owned()))
        );
        assert!(Pattern::parse("100").is_err());
        assert_eq!(
            Pattern::parse("8B F"),
            Err(PatternError::InvalidToken("F".to_owned()))
        );
        assert_eq!(
            Pattern::parse("+F 8B"),
            Err(PatternError::InvalidToken("+F".to_owned()))
        );
    }

    #[test]
    fn finds_first_match_with_wildcards() {
        let haystack = [0x00, 0xe8, 0x10, 0x20, 0x90, 0xe8, 0x30, 0x40, 0x90];
        let pattern: Pattern = "E8 ?? ?? 90".parse().unwrap();
        assert_eq!(pattern.find(&haystack), Some(1));
        assert_eq!(pattern.find_all(&haystack).collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn does_not_match_past_the_end() {
        let pattern = Pattern::parse("01 02 03").unwrap();
        assert_eq!(pattern.find(&[0x00, 0x01, 0x02]), None);
        assert_eq!(pattern.find(&[]), None);
    }
}
