use serde::{Deserialize, Serialize};

pub const REPLACE_INVALID: char = '_';

const WINDOWS_INVALID: &[char] = &['\\', '|', '/', '<', '>', ':', '"', '?', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidCharPolicy {
    #[default]
    Auto,
    Unix,
    Windows,
}

impl InvalidCharPolicy {
    fn resolved(self) -> Self {
        match self {
            Self::Auto if cfg!(windows) => Self::Windows,
            Self::Auto => Self::Unix,
            other => other,
        }
    }

    pub fn is_invalid(self, ch: char) -> bool {
        if ch == '\0' {
            return true;
        }
        match self.resolved() {
            Self::Windows => WINDOWS_INVALID.contains(&ch),
            _ => ch == '/',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    pub fn parse(rule: &str) -> Option<Self> {
        let (from, to) = rule.rsplit_once(':')?;
        Some(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

pub fn apply_replacements(mut value: String, replacements: &[Replacement]) -> String {
    for rule in replacements {
        if rule.from.is_empty() {
            continue;
        }
        value = value.replace(&rule.from, &rule.to);
    }
    value
}

pub fn strip_invalid_chars(value: &str, policy: InvalidCharPolicy) -> String {
    value
        .chars()
        .map(|ch| {
            if policy.is_invalid(ch) {
                REPLACE_INVALID
            } else {
                ch
            }
        })
        .collect()
}
