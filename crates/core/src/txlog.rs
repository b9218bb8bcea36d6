use crate::error::{RenameError, Result};
use crate::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_SEPARATOR: &str = "|";
pub const DEFAULT_LOG_FILE_NAME: &str = ".rn";

const HEADER_KEY: &str = "sep";
const ERROR_TAG: &str = "ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    #[default]
    Overwrite,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenameOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub old_name: String,
    pub new_name: String,
    pub outcome: RenameOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct LogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

pub struct TransactionLog<'a> {
    fs: &'a dyn FileSystem,
    dir: PathBuf,
    separator: String,
    writer: Option<LogWriter>,
}

impl<'a> TransactionLog<'a> {
    pub fn open(
        fs: &'a dyn FileSystem,
        dir: &Path,
        log_path: &Path,
        separator: &str,
        mode: LogMode,
    ) -> Result<Self> {
        let open_err = |source: io::Error| RenameError::LogOpen {
            path: log_path.to_path_buf(),
            source,
        };

        let existing_header = match mode {
            LogMode::Append if log_path.is_file() => read_first_line(log_path).map_err(open_err)?,
            _ => None,
        };

        let (file, separator) = match existing_header {
            Some(header) => {
                let stored = parse_header(&header).unwrap_or_else(|| {
                    tracing::warn!(
                        "区切り文字のない取り消しログに追記します: {}",
                        log_path.display()
                    );
                    DEFAULT_SEPARATOR.to_string()
                });
                let file = OpenOptions::new()
                    .append(true)
                    .open(log_path)
                    .map_err(open_err)?;
                (file, stored)
            }
            None => {
                let mut file = File::create(log_path).map_err(open_err)?;
                writeln!(file, "{HEADER_KEY}={separator}").map_err(open_err)?;
                (file, separator.to_string())
            }
        };

        tracing::debug!(
            "opened transaction log {} (sep={separator}, mode={mode:?})",
            log_path.display()
        );

        Ok(Self {
            fs,
            dir: dir.to_path_buf(),
            separator,
            writer: Some(LogWriter {
                path: log_path.to_path_buf(),
                writer: BufWriter::new(file),
            }),
        })
    }

    pub fn unlogged(fs: &'a dyn FileSystem, dir: &Path) -> Self {
        Self {
            fs,
            dir: dir.to_path_buf(),
            separator: DEFAULT_SEPARATOR.to_string(),
            writer: None,
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn path(&self) -> Option<&Path> {
        self.writer.as_ref().map(|w| w.path.as_path())
    }

    pub fn record(&mut self, old_name: &str, new_name: &str) -> Result<RenameRecord> {
        let from = self.dir.join(old_name);
        let to = self.dir.join(new_name);

        let record = match guarded_rename(self.fs, &from, &to, new_name) {
            Ok(()) => RenameRecord {
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
                outcome: RenameOutcome::Success,
                error: None,
            },
            Err(source) => {
                let err = RenameError::RenameFailure { from, to, source };
                tracing::warn!("{err}");
                RenameRecord {
                    old_name: old_name.to_string(),
                    new_name: new_name.to_string(),
                    outcome: RenameOutcome::Failed,
                    error: Some(err.to_string()),
                }
            }
        };

        self.write_record(&record)?;
        Ok(record)
    }

    fn write_record(&mut self, record: &RenameRecord) -> Result<()> {
        let sep = &self.separator;
        let Some(log) = self.writer.as_mut() else {
            return Ok(());
        };

        let line = match record.outcome {
            RenameOutcome::Success => format!("{}{sep}{}\n", record.old_name, record.new_name),
            RenameOutcome::Failed => format!(
                "{ERROR_TAG}{sep}{}{sep}{}\n",
                record.old_name, record.new_name
            ),
        };

        log.writer
            .write_all(line.as_bytes())
            .and_then(|_| log.writer.flush())
            .map_err(|source| RenameError::LogWrite {
                path: log.path.clone(),
                source,
            })
    }

    pub fn close(mut self) -> Result<()> {
        if let Some(mut log) = self.writer.take() {
            log.writer.flush().map_err(|source| RenameError::LogWrite {
                path: log.path.clone(),
                source,
            })?;
            tracing::debug!("closed transaction log {}", log.path.display());
        }
        Ok(())
    }
}

fn guarded_rename(fs: &dyn FileSystem, from: &Path, to: &Path, new_name: &str) -> io::Result<()> {
    if new_name.is_empty() || new_name == "." || new_name == ".." {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("不正なファイル名です: {new_name:?}"),
        ));
    }
    if from != to && fs.exists(to) && !is_case_change(fs, from, to) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("リネーム先が既に存在します: {}", to.display()),
        ));
    }
    fs.rename(from, to)
}

fn is_case_change(fs: &dyn FileSystem, from: &Path, to: &Path) -> bool {
    let same_spelling = match (from.file_name(), to.file_name()) {
        (Some(a), Some(b)) => {
            a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
        }
        _ => false,
    };
    same_spelling && fs.same_file(from, to)
}

fn read_first_line(path: &Path) -> io::Result<Option<String>> {
    let mut line = String::new();
    let read = BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok((read > 0).then_some(line))
}

pub fn parse_header(line: &str) -> Option<String> {
    let (_, value) = line.split_once('=')?;
    let value = value.trim_end_matches(['\n', '\r']);
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum LogLine<'l> {
    Renamed(Vec<(&'l str, &'l str)>),
    Failed,
    Malformed,
}

fn parse_line<'l>(line: &'l str, sep: &str) -> LogLine<'l> {
    let error_prefix = format!("{ERROR_TAG}{sep}");
    if line.starts_with(&error_prefix) && line.matches(sep).count() != 1 {
        return LogLine::Failed;
    }
    let splits: Vec<_> = line
        .match_indices(sep)
        .map(|(at, _)| (&line[..at], &line[at + sep.len()..]))
        .filter(|(old, new)| !old.is_empty() && !new.is_empty())
        .collect();
    if splits.is_empty() {
        LogLine::Malformed
    } else {
        LogLine::Renamed(splits)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UndoLogReport {
    pub log_path: PathBuf,
    pub restored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub ignored: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn undo_log(fs: &dyn FileSystem, log_path: &Path) -> Result<UndoLogReport> {
    let replay_err = |reason: String| RenameError::UndoReplay {
        path: log_path.to_path_buf(),
        reason,
    };

    let raw = fs::read_to_string(log_path).map_err(|err| replay_err(err.to_string()))?;
    let mut lines = raw.lines();
    let separator = lines
        .next()
        .and_then(parse_header)
        .ok_or_else(|| replay_err("区切り文字を取得できません".to_string()))?;

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let mut report = UndoLogReport {
        log_path: log_path.to_path_buf(),
        ..UndoLogReport::default()
    };

    let mut renamed = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        match parse_line(line, &separator) {
            LogLine::Renamed(splits) => renamed.push(splits),
            LogLine::Failed | LogLine::Malformed => report.ignored += 1,
        }
    }

    for splits in renamed.into_iter().rev() {
        let Some((old, new)) = splits
            .iter()
            .copied()
            .find(|(_, new)| fs.exists(&dir.join(new)))
        else {
            tracing::debug!("skip {}: already gone", splits[0].1);
            report.skipped += 1;
            continue;
        };
        let current = dir.join(new);
        let original = dir.join(old);
        match guarded_rename(fs, &current, &original, old) {
            Ok(()) => {
                tracing::debug!("restored {} -> {}", new, old);
                report.restored += 1;
            }
            Err(err) => {
                tracing::warn!(
                    "取り消しに失敗しました: {} -> {}: {err}",
                    current.display(),
                    original.display()
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
