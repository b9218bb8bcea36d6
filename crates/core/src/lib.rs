mod apply;
mod config;
mod digits;
mod error;
mod filter;
mod formatter;
mod fs;
mod natural;
mod planner;
mod sanitize;
mod template;
mod txlog;

pub use apply::{
    run_batch, undo, undo_paths, BatchReport, BatchRunner, DirectoryReport, NullSink,
    PlannedName, RenameSink, UndoReport,
};
pub use config::{app_paths, load_config, parse_config, save_config, AppConfig, AppPaths};
pub use digits::{DigitCounter, DigitSequence};
pub use error::RenameError;
pub use filter::{FileFilter, FilterOptions};
pub use formatter::{
    extension_of, Clock, DateContext, DateFormatter, ExtensionFormatter, RandomSource,
    SystemClock, ThreadRandom, DEFAULT_DATE_FORMAT,
};
pub use fs::{FileSystem, FileTimes, StdFileSystem};
pub use natural::{natural_cmp, natural_sort};
pub use planner::{
    collect_candidates, BatchOptions, FileCandidate, LogOptions, NamePlanner, RenameStats,
};
pub use sanitize::{
    apply_replacements, strip_invalid_chars, InvalidCharPolicy, Replacement, REPLACE_INVALID,
};
pub use template::{
    is_valid_date_format, parse_template, DateSource, DigitSpec, FormatTemplate, Placeholder,
    Segment, TemplateWarning,
};
pub use txlog::{
    parse_header, undo_log, LogMode, RenameOutcome, RenameRecord, TransactionLog, UndoLogReport,
    DEFAULT_LOG_FILE_NAME, DEFAULT_SEPARATOR,
};
