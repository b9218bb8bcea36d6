use crate::error::RenameError;
use crate::filter::FileFilter;
use crate::formatter::{Clock, RandomSource, SystemClock, ThreadRandom};
use crate::fs::{FileSystem, StdFileSystem};
use crate::natural::natural_cmp;
use crate::planner::{collect_candidates, BatchOptions, NamePlanner, RenameStats};
use crate::txlog::{
    undo_log, RenameOutcome, RenameRecord, TransactionLog, UndoLogReport, DEFAULT_LOG_FILE_NAME,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub trait RenameSink {
    fn directory_started(&mut self, _dir: &Path) {}
    fn renamed(&mut self, _record: &RenameRecord) {}
    fn planned(&mut self, _old_name: &str, _new_name: &str) {}
    fn skipped(&mut self, _file_name: &str, _reason: &RenameError) {}
    fn directory_finished(&mut self, _report: &DirectoryReport) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenameSink for NullSink {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedName {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub log_path: Option<PathBuf>,
    pub stats: RenameStats,
    pub records: Vec<RenameRecord>,
    pub planned: Vec<PlannedName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchReport {
    pub directories: Vec<DirectoryReport>,
}

impl BatchReport {
    pub fn renamed(&self) -> usize {
        self.directories.iter().map(|d| d.stats.renamed).sum()
    }

    pub fn failed(&self) -> usize {
        self.directories.iter().map(|d| d.stats.failed).sum()
    }

    pub fn aborted(&self) -> usize {
        self.directories.iter().filter(|d| d.error.is_some()).count()
    }
}

pub struct BatchRunner<'a> {
    fs: &'a dyn FileSystem,
    clock: &'a dyn Clock,
    rng: &'a mut dyn RandomSource,
    sink: &'a mut dyn RenameSink,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        clock: &'a dyn Clock,
        rng: &'a mut dyn RandomSource,
        sink: &'a mut dyn RenameSink,
    ) -> Self {
        Self {
            fs,
            clock,
            rng,
            sink,
        }
    }

    pub fn run(&mut self, directories: &[PathBuf], options: &BatchOptions) -> Result<BatchReport> {
        let filter = FileFilter::new(&options.filter)?;
        let mut planner = NamePlanner::new(options);
        if let Some(template) = planner.template() {
            for warning in template.warnings() {
                tracing::warn!("{warning}");
            }
        }

        let mut report = BatchReport::default();
        let mut seen = HashSet::<PathBuf>::new();
        for dir in directories {
            let key = fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            if !seen.insert(key) {
                tracing::debug!("duplicate input skipped: {}", dir.display());
                continue;
            }

            let dir_report = match self.run_directory(dir, options, &filter, &mut planner) {
                Ok(dir_report) => dir_report,
                Err(err @ RenameError::LogOpen { .. }) => return Err(err.into()),
                Err(err) => {
                    tracing::warn!("{err}");
                    DirectoryReport {
                        directory: dir.clone(),
                        error: Some(err.to_string()),
                        ..DirectoryReport::default()
                    }
                }
            };
            self.sink.directory_finished(&dir_report);
            report.directories.push(dir_report);
        }

        Ok(report)
    }

    fn run_directory(
        &mut self,
        dir: &Path,
        options: &BatchOptions,
        filter: &FileFilter,
        planner: &mut NamePlanner,
    ) -> std::result::Result<DirectoryReport, RenameError> {
        tracing::info!("{}", dir.display());
        self.sink.directory_started(dir);
        planner.reset();

        let mut report = DirectoryReport {
            directory: dir.to_path_buf(),
            ..DirectoryReport::default()
        };
        let candidates = collect_candidates(
            self.fs,
            dir,
            &options.log.file_name,
            filter,
            &mut report.stats,
        )?;

        let mut log = if options.dry_run || !options.log.enabled {
            TransactionLog::unlogged(self.fs, dir)
        } else {
            TransactionLog::open(
                self.fs,
                dir,
                &dir.join(&options.log.file_name),
                &options.log.separator,
                options.log.mode,
            )?
        };
        report.log_path = log.path().map(Path::to_path_buf);

        for candidate in &candidates {
            let new_name = match planner.plan_name(candidate, self.fs, self.clock, &mut *self.rng)
            {
                Ok(name) => name,
                Err(err) => {
                    tracing::warn!("{}: {err}", candidate.file_name);
                    report.stats.failed += 1;
                    self.sink.skipped(&candidate.file_name, &err);
                    continue;
                }
            };
            report.stats.planned += 1;

            if options.dry_run {
                self.sink.planned(&candidate.file_name, &new_name);
                report.planned.push(PlannedName {
                    old_name: candidate.file_name.clone(),
                    new_name,
                });
                continue;
            }

            let record = log.record(&candidate.file_name, &new_name)?;
            match record.outcome {
                RenameOutcome::Success => report.stats.renamed += 1,
                RenameOutcome::Failed => report.stats.failed += 1,
            }
            self.sink.renamed(&record);
            report.records.push(record);
        }

        log.close()?;
        tracing::info!(
            "{}: renamed={} failed={} filtered={}",
            dir.display(),
            report.stats.renamed,
            report.stats.failed,
            report.stats.filtered_out
        );
        Ok(report)
    }
}

pub fn run_batch(
    directories: &[PathBuf],
    options: &BatchOptions,
    sink: &mut dyn RenameSink,
) -> Result<BatchReport> {
    let mut rng = ThreadRandom;
    BatchRunner::new(&StdFileSystem, &SystemClock, &mut rng, sink).run(directories, options)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UndoReport {
    pub logs: Vec<UndoLogReport>,
}

impl UndoReport {
    pub fn restored(&self) -> usize {
        self.logs.iter().map(|l| l.restored).sum()
    }
}

pub fn undo_paths(fs: &dyn FileSystem, targets: &[PathBuf], log_file_name: &str) -> UndoReport {
    let mut report = UndoReport::default();

    for target in targets {
        if !fs.exists(target) {
            tracing::warn!("取り消し対象が見つかりません: {}", target.display());
            continue;
        }

        let logs = if fs.is_file(target) {
            vec![target.clone()]
        } else {
            match find_logs(fs, target, log_file_name) {
                Ok(logs) => logs,
                Err(err) => {
                    tracing::warn!("{err}");
                    report.logs.push(UndoLogReport {
                        log_path: target.clone(),
                        error: Some(err.to_string()),
                        ..UndoLogReport::default()
                    });
                    continue;
                }
            }
        };

        for log_path in logs {
            tracing::info!("{}", log_path.display());
            match undo_log(fs, &log_path) {
                Ok(log_report) => report.logs.push(log_report),
                Err(err) => {
                    tracing::warn!("{err}");
                    report.logs.push(UndoLogReport {
                        log_path,
                        error: Some(err.to_string()),
                        ..UndoLogReport::default()
                    });
                }
            }
        }
    }

    report
}

fn find_logs(
    fs: &dyn FileSystem,
    dir: &Path,
    log_file_name: &str,
) -> std::result::Result<Vec<PathBuf>, RenameError> {
    let entries = fs
        .list_directory(dir)
        .map_err(|source| RenameError::DirectoryAccess {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut logs: Vec<(String, PathBuf)> = entries
        .into_iter()
        .filter(|path| fs.is_file(path))
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            (name == log_file_name || name.ends_with(DEFAULT_LOG_FILE_NAME))
                .then_some((name, path))
        })
        .collect();
    logs.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    Ok(logs.into_iter().map(|(_, path)| path).collect())
}

pub fn undo(targets: &[PathBuf], log_file_name: &str) -> UndoReport {
    undo_paths(&StdFileSystem, targets, log_file_name)
}
