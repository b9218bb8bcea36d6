use crate::error::{RenameError, Result};
use crate::fs::FileSystem;
use crate::template::{DateSource, Placeholder};
use chrono::{DateTime, Local};
use rand::Rng;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

pub trait RandomSource {
    fn draw(&mut self, low: i64, high: i64) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&mut self, low: i64, high: i64) -> i64 {
        rand::thread_rng().gen_range(low..=high)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionFormatter {
    extension: String,
}

impl ExtensionFormatter {
    pub fn add_context(&mut self, file_name: &str) {
        self.extension = extension_of(file_name).to_string();
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn format(&self, placeholder: &Placeholder, rng: &mut dyn RandomSource) -> Option<String> {
        match placeholder {
            Placeholder::Extension => Some(self.extension.clone()),
            Placeholder::Random { low, high } => Some(rng.draw(*low, *high).to_string()),
            _ => None,
        }
    }
}

pub fn extension_of(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct DateFormatter {
    default_format: String,
    require_file_exist: bool,
    path: PathBuf,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT, true)
    }
}

impl DateFormatter {
    pub fn new(default_format: &str, require_file_exist: bool) -> Self {
        Self {
            default_format: default_format.to_string(),
            require_file_exist,
            path: PathBuf::new(),
        }
    }

    pub fn add_context(&mut self, path: &Path) {
        self.path = path.to_path_buf();
    }

    pub fn context(
        &self,
        fs: &dyn FileSystem,
        clock: &dyn Clock,
        with_file_times: bool,
    ) -> Result<DateContext> {
        let epoch = DateTime::<Local>::from(UNIX_EPOCH);
        let mut ctx = DateContext {
            created: epoch,
            modified: epoch,
            now: clock.now(),
            default_format: self.default_format.clone(),
        };

        if !with_file_times {
            return Ok(ctx);
        }

        if fs.is_file(&self.path) {
            let times = fs.stat(&self.path).map_err(|err| {
                tracing::debug!("stat failed for {}: {err}", self.path.display());
                RenameError::MissingFile(self.path.clone())
            })?;
            ctx.created = times.created;
            ctx.modified = times.modified;
        } else if self.require_file_exist {
            return Err(RenameError::MissingFile(self.path.clone()));
        }

        Ok(ctx)
    }
}

#[derive(Debug, Clone)]
pub struct DateContext {
    created: DateTime<Local>,
    modified: DateTime<Local>,
    now: DateTime<Local>,
    default_format: String,
}

impl DateContext {
    pub fn render(&self, source: DateSource, format: Option<&str>) -> Result<String> {
        let time = match source {
            DateSource::FileModified => &self.modified,
            DateSource::FileCreated => &self.created,
            DateSource::Current => &self.now,
        };
        let format = format.unwrap_or(&self.default_format);
        let mut out = String::new();
        write!(out, "{}", time.format(format))
            .map_err(|_| RenameError::DateFormat(format.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub struct FixedClock(pub DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    impl FixedClock {
        pub fn at(y: i32, m: u32, d: u32) -> Self {
            let time = Local
                .with_ymd_and_hms(y, m, d, 12, 0, 0)
                .single()
                .expect("valid local time");
            Self(time)
        }
    }

    pub struct SequenceRandom {
        values: Vec<i64>,
        next: usize,
    }

    impl SequenceRandom {
        pub fn new(values: Vec<i64>) -> Self {
            Self { values, next: 0 }
        }
    }

    impl RandomSource for SequenceRandom {
        fn draw(&mut self, low: i64, high: i64) -> i64 {
            let value = self.values.get(self.next).copied().unwrap_or(low);
            self.next += 1;
            value.clamp(low, high)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{FixedClock, SequenceRandom};
    use super::*;
    use crate::fs::StdFileSystem;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn extension_is_text_after_last_dot() {
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn extension_formatter_uses_latest_context() {
        let mut formatter = ExtensionFormatter::default();
        let mut rng = ThreadRandom;
        formatter.add_context("a.txt");
        formatter.add_context("b.jpeg");
        assert_eq!(
            formatter.format(&Placeholder::Extension, &mut rng).as_deref(),
            Some("jpeg")
        );
    }

    #[test]
    fn degenerate_random_ranges_are_constant() {
        let formatter = ExtensionFormatter::default();
        let mut rng = ThreadRandom;
        for _ in 0..20 {
            let zero = formatter.format(&Placeholder::Random { low: 0, high: 0 }, &mut rng);
            let five = formatter.format(&Placeholder::Random { low: 5, high: 5 }, &mut rng);
            assert_eq!(zero.as_deref(), Some("0"));
            assert_eq!(five.as_deref(), Some("5"));
        }
    }

    #[test]
    fn random_draws_stay_in_bounds() {
        let formatter = ExtensionFormatter::default();
        let mut rng = ThreadRandom;
        for _ in 0..200 {
            let value: i64 = formatter
                .format(&Placeholder::Random { low: -3, high: 3 }, &mut rng)
                .expect("random handled")
                .parse()
                .expect("integer");
            assert!((-3..=3).contains(&value));
        }
    }

    #[test]
    fn random_draws_are_independent_per_call() {
        let formatter = ExtensionFormatter::default();
        let mut rng = SequenceRandom::new(vec![1, 7]);
        let placeholder = Placeholder::Random { low: 0, high: 9 };
        assert_eq!(formatter.format(&placeholder, &mut rng).as_deref(), Some("1"));
        assert_eq!(formatter.format(&placeholder, &mut rng).as_deref(), Some("7"));
    }

    #[test]
    fn missing_file_is_an_error_when_required() {
        let temp = tempdir().expect("tempdir");
        let mut formatter = DateFormatter::default();
        formatter.add_context(&temp.path().join("missing.txt"));
        let err = formatter
            .context(&StdFileSystem, &FixedClock::at(2024, 1, 2), true)
            .expect_err("missing file must fail");
        assert!(matches!(err, RenameError::MissingFile(_)));
    }

    #[test]
    fn missing_file_defaults_to_epoch_when_not_required() {
        let temp = tempdir().expect("tempdir");
        let mut formatter = DateFormatter::new("%Y", false);
        formatter.add_context(&temp.path().join("missing.txt"));
        let ctx = formatter
            .context(&StdFileSystem, &FixedClock::at(2024, 1, 2), true)
            .expect("epoch fallback");
        let year = ctx
            .render(DateSource::FileModified, None)
            .expect("render");
        assert!(year == "1970" || year == "1969", "local epoch year: {year}");
    }

    #[test]
    fn current_date_uses_clock_and_default_format() {
        let formatter = DateFormatter::default();
        let ctx = formatter
            .context(&StdFileSystem, &FixedClock::at(2024, 3, 9), false)
            .expect("no file lookup");
        assert_eq!(
            ctx.render(DateSource::Current, None).expect("render"),
            "2024-03-09"
        );
        assert_eq!(
            ctx.render(DateSource::Current, Some("%d/%m")).expect("render"),
            "09/03"
        );
    }

    #[test]
    fn file_modified_date_comes_from_stat() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("a.txt");
        fs::write(&path, b"a").expect("write");
        let mut formatter = DateFormatter::default();
        formatter.add_context(&path);
        let ctx = formatter
            .context(&StdFileSystem, &FixedClock::at(2000, 1, 1), true)
            .expect("existing file");
        let expected = Local::now().format(DEFAULT_DATE_FORMAT).to_string();
        let rendered = ctx.render(DateSource::FileModified, None).expect("render");
        // A write just before midnight may land on the previous day.
        assert!(rendered <= expected, "{rendered} vs {expected}");
        assert_ne!(rendered, "2000-01-01");
    }
}
