use crate::digits::DigitSequence;
use crate::error::{RenameError, Result};
use crate::filter::{FileFilter, FilterOptions};
use crate::formatter::{
    extension_of, Clock, DateFormatter, ExtensionFormatter, RandomSource, DEFAULT_DATE_FORMAT,
};
use crate::fs::FileSystem;
use crate::natural::natural_cmp;
use crate::sanitize::{apply_replacements, strip_invalid_chars, InvalidCharPolicy, Replacement};
use crate::template::{parse_template, FormatTemplate, Placeholder, Segment};
use crate::txlog::{LogMode, DEFAULT_LOG_FILE_NAME, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    pub enabled: bool,
    pub file_name: String,
    pub separator: String,
    pub mode: LogMode,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            mode: LogMode::Overwrite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub template: Option<String>,
    pub replacements: Vec<Replacement>,
    pub filter: FilterOptions,
    pub log: LogOptions,
    pub date_format: String,
    pub require_file_exist: bool,
    pub restrict: InvalidCharPolicy,
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            template: None,
            replacements: Vec::new(),
            filter: FilterOptions::default(),
            log: LogOptions::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            require_file_exist: true,
            restrict: InvalidCharPolicy::Auto,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub file_name: String,
}

impl FileCandidate {
    pub fn extension(&self) -> &str {
        extension_of(&self.file_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RenameStats {
    pub scanned: usize,
    pub skipped_non_file: usize,
    pub filtered_out: usize,
    pub planned: usize,
    pub renamed: usize,
    pub failed: usize,
}

pub fn collect_candidates(
    fs: &dyn FileSystem,
    dir: &Path,
    log_file_name: &str,
    filter: &FileFilter,
    stats: &mut RenameStats,
) -> Result<Vec<FileCandidate>> {
    let entries = fs
        .list_directory(dir)
        .map_err(|source| RenameError::DirectoryAccess {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut named = Vec::with_capacity(entries.len());
    for path in entries {
        stats.scanned += 1;
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            tracing::warn!("UTF-8でないファイル名はスキップします: {}", path.display());
            stats.skipped_non_file += 1;
            continue;
        };
        named.push(FileCandidate { path, file_name });
    }
    named.sort_by(|a, b| natural_cmp(&a.file_name, &b.file_name));

    let mut out = Vec::with_capacity(named.len());
    for candidate in named {
        if !fs.is_file(&candidate.path) || candidate.file_name == log_file_name {
            stats.skipped_non_file += 1;
            continue;
        }
        if !filter.accepts(&candidate.file_name) {
            tracing::debug!("filtered out {}", candidate.file_name);
            stats.filtered_out += 1;
            continue;
        }
        out.push(candidate);
    }

    Ok(out)
}

#[derive(Debug, Clone)]
pub struct NamePlanner {
    template: Option<FormatTemplate>,
    digits: DigitSequence,
    dates: DateFormatter,
    text: ExtensionFormatter,
    replacements: Vec<Replacement>,
    restrict: InvalidCharPolicy,
}

impl NamePlanner {
    pub fn new(options: &BatchOptions) -> Self {
        let template = options.template.as_deref().map(parse_template);
        let digits = template
            .as_ref()
            .map(|t| DigitSequence::new(&t.digit_specs()))
            .unwrap_or_default();

        Self {
            template,
            digits,
            dates: DateFormatter::new(&options.date_format, options.require_file_exist),
            text: ExtensionFormatter::default(),
            replacements: options.replacements.clone(),
            restrict: options.restrict,
        }
    }

    pub fn template(&self) -> Option<&FormatTemplate> {
        self.template.as_ref()
    }

    pub fn reset(&mut self) {
        self.digits.reset();
    }

    pub fn plan_name(
        &mut self,
        candidate: &FileCandidate,
        fs: &dyn FileSystem,
        clock: &dyn Clock,
        rng: &mut dyn RandomSource,
    ) -> Result<String> {
        let rendered = match &self.template {
            Some(template) => {
                self.dates.add_context(&candidate.path);
                let date_ctx = if template.uses_dates() {
                    Some(
                        self.dates
                            .context(fs, clock, template.uses_file_dates())?,
                    )
                } else {
                    None
                };
                self.text.add_context(&candidate.file_name);

                let mut out = String::new();
                for segment in template.segments() {
                    match segment {
                        Segment::Literal(text) => out.push_str(text),
                        Segment::Placeholder(Placeholder::Digit { slot, .. }) => {
                            out.push_str(&self.digits.next_token(*slot).unwrap_or_default());
                        }
                        Segment::Placeholder(Placeholder::Date { source, format }) => {
                            if let Some(ctx) = &date_ctx {
                                out.push_str(&ctx.render(*source, format.as_deref())?);
                            }
                        }
                        Segment::Placeholder(placeholder) => {
                            if let Some(value) = self.text.format(placeholder, rng) {
                                out.push_str(&value);
                            }
                        }
                    }
                }
                out
            }
            None => candidate.file_name.clone(),
        };

        let replaced = apply_replacements(rendered, &self.replacements);
        Ok(strip_invalid_chars(&replaced, self.restrict))
    }
}
