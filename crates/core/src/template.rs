use chrono::format::{Item, StrftimeItems};
use thiserror::Error;

const OPEN: &str = "$[";
const CLOSE: char = ']';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Digit {
        slot: usize,
        spec: DigitSpec,
    },
    Date {
        source: DateSource,
        format: Option<String>,
    },
    Random {
        low: i64,
        high: i64,
    },
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitSpec {
    pub start: i64,
    pub increment: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateSource {
    FileModified,
    FileCreated,
    Current,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateWarning {
    #[error("プレースホルダが閉じていません (文字列として扱います): {0}")]
    Unterminated(String),
    #[error("未対応プレースホルダです (文字列として扱います): {0}")]
    UnknownPlaceholder(String),
    #[error("連番の増分が0です (文字列として扱います): {0}")]
    ZeroIncrement(String),
    #[error("乱数の範囲が不正です (文字列として扱います): {0}")]
    InvalidRandomRange(String),
    #[error("日付書式が不正です (文字列として扱います): {0}")]
    InvalidDateFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    segments: Vec<Segment>,
    warnings: Vec<TemplateWarning>,
}

impl FormatTemplate {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn warnings(&self) -> &[TemplateWarning] {
        &self.warnings
    }

    pub fn digit_specs(&self) -> Vec<DigitSpec> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(Placeholder::Digit { spec, .. }) => Some(*spec),
                _ => None,
            })
            .collect()
    }

    pub fn uses_dates(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Placeholder(Placeholder::Date { .. })))
    }

    pub fn uses_file_dates(&self) -> bool {
        self.segments.iter().any(|segment| {
            matches!(
                segment,
                Segment::Placeholder(Placeholder::Date {
                    source: DateSource::FileModified | DateSource::FileCreated,
                    ..
                })
            )
        })
    }
}

pub fn parse_template(input: &str) -> FormatTemplate {
    let mut segments = Vec::new();
    let mut warnings = Vec::new();
    let mut literal = String::new();
    let mut slot = 0usize;
    let mut rest = input;

    while let Some(start) = rest.find(OPEN) {
        literal.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];

        let Some(close) = after.find(CLOSE) else {
            warnings.push(TemplateWarning::Unterminated(rest[start..].to_string()));
            literal.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let body = &after[..close];
        if body.contains('[') {
            // Keep the opener as text and rescan so an inner placeholder still resolves.
            warnings.push(TemplateWarning::UnknownPlaceholder(format!("{OPEN}{body}{CLOSE}")));
            literal.push_str(OPEN);
            rest = after;
            continue;
        }

        let raw = &rest[start..start + OPEN.len() + close + 1];
        match classify(body, slot) {
            Ok(placeholder) => {
                if matches!(placeholder, Placeholder::Digit { .. }) {
                    slot += 1;
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(placeholder));
            }
            Err(warning) => {
                warnings.push(warning);
                literal.push_str(raw);
            }
        }
        rest = &after[close + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    FormatTemplate { segments, warnings }
}

fn classify(body: &str, slot: usize) -> Result<Placeholder, TemplateWarning> {
    let raw = || format!("{OPEN}{body}{CLOSE}");

    if body == "EXT" {
        return Ok(Placeholder::Extension);
    }

    let (head, tail) = match body.split_once(':') {
        Some((head, tail)) => (head, Some(tail)),
        None => (body, None),
    };

    if let Some(source) = date_source(head) {
        return match tail {
            None => Ok(Placeholder::Date {
                source,
                format: None,
            }),
            Some("") => Err(TemplateWarning::UnknownPlaceholder(raw())),
            Some(format) if is_valid_date_format(format) => Ok(Placeholder::Date {
                source,
                format: Some(format.to_string()),
            }),
            Some(_) => Err(TemplateWarning::InvalidDateFormat(raw())),
        };
    }

    if head == "RND" {
        let bounds = tail.and_then(|t| t.split_once(':'));
        let Some((low, high)) = bounds.and_then(|(l, h)| Some((parse_int(l)?, parse_int(h)?)))
        else {
            return Err(TemplateWarning::UnknownPlaceholder(raw()));
        };
        if low > high {
            return Err(TemplateWarning::InvalidRandomRange(raw()));
        }
        return Ok(Placeholder::Random { low, high });
    }

    let numbers: Option<Vec<i64>> = body.split(':').map(parse_int).collect();
    let spec = match numbers.as_deref() {
        Some([start, end]) => DigitSpec {
            start: *start,
            increment: 1,
            end: *end,
        },
        Some([start, increment, end]) => DigitSpec {
            start: *start,
            increment: *increment,
            end: *end,
        },
        _ => return Err(TemplateWarning::UnknownPlaceholder(raw())),
    };
    if spec.increment == 0 {
        return Err(TemplateWarning::ZeroIncrement(raw()));
    }

    Ok(Placeholder::Digit { slot, spec })
}

fn date_source(head: &str) -> Option<DateSource> {
    match head {
        "FDM" => Some(DateSource::FileModified),
        "FDC" => Some(DateSource::FileCreated),
        "CD" => Some(DateSource::Current),
        _ => None,
    }
}

fn parse_int(value: &str) -> Option<i64> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
