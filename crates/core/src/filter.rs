use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub start_with: Vec<String>,
    pub ends_with: Vec<String>,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    start_with: Vec<String>,
    ends_with: Vec<String>,
    matches: Vec<Regex>,
}

impl FileFilter {
    pub fn new(options: &FilterOptions) -> Result<Self> {
        let matches = options
            .matches
            .iter()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("正規表現が不正です: {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            start_with: options.start_with.clone(),
            ends_with: options.ends_with.clone(),
            matches,
        })
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        let starts = self.start_with.is_empty()
            || self
                .start_with
                .iter()
                .any(|prefix| file_name.starts_with(prefix.as_str()));
        let ends = self.ends_with.is_empty()
            || self
                .ends_with
                .iter()
                .any(|suffix| file_name.ends_with(suffix.as_str()));
        let matched =
            self.matches.is_empty() || self.matches.iter().any(|re| re.is_match(file_name));

        starts && ends && matched
    }
}
