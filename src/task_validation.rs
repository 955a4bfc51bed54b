use crate::task::{
    DEFAULT_COLOR, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS, Task, TaskDraft, TaskPatch,
};
use crate::time::TimeOfDay;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Every failing field of a payload, keyed by its canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    /// Keeps the first message reported for a field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for ValidationErrors {}

/// A creation payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub date: NaiveDate,
}

/// A partial update that passed validation. Outer `None` means "leave as is";
/// for the optional text fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidPatch {
    pub title: Option<String>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
}

impl ValidPatch {
    /// Only the time range changes; used by drag relocation.
    pub fn times(start_time: TimeOfDay, end_time: TimeOfDay) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(start) = self.start_time {
            task.start_time = start;
        }
        if let Some(end) = self.end_time {
            task.end_time = end;
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(color) = &self.color {
            task.color = color.clone();
        }
        if let Some(icon) = &self.icon {
            task.icon = icon.clone();
        }
    }
}

pub fn validate_draft(draft: &TaskDraft) -> Result<NewTask, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = match draft.title.as_deref() {
        Some(raw) => check_title(raw, &mut errors),
        None => {
            errors.add("title", "title is required");
            None
        }
    };
    let start_time = required_time("startTime", draft.start_time.as_deref(), &mut errors);
    let end_time = required_time("endTime", draft.end_time.as_deref(), &mut errors);
    if let (Some(start), Some(end)) = (start_time, end_time) {
        check_order(start, end, &mut errors);
    }
    let description = draft
        .description
        .as_deref()
        .and_then(|raw| check_description(raw, &mut errors));
    let color = match draft.color.as_deref() {
        Some(raw) => check_color(raw, &mut errors),
        None => Some(DEFAULT_COLOR.to_string()),
    };
    let date = match draft.date.as_deref() {
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                errors.add("date", format!("invalid date '{raw}' (expected YYYY-MM-DD)"));
                None
            }
        },
        None => {
            errors.add("date", "date is required");
            None
        }
    };

    match (title, start_time, end_time, color, date) {
        (Some(title), Some(start_time), Some(end_time), Some(color), Some(date)) => errors
            .into_result(NewTask {
                title,
                start_time,
                end_time,
                description,
                color,
                icon: normalize_optional(draft.icon.as_deref()),
                date,
            }),
        _ => Err(errors),
    }
}

/// Validates only the supplied fields. When either bound of the range is
/// supplied, the resulting range (merged with the task's current bounds)
/// must still be strictly increasing.
pub fn validate_patch(patch: &TaskPatch, current: &Task) -> Result<ValidPatch, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut valid = ValidPatch::default();

    if let Some(raw) = patch.title.as_deref() {
        valid.title = check_title(raw, &mut errors);
    }
    if let Some(raw) = patch.start_time.as_deref() {
        valid.start_time = parse_time("startTime", raw, &mut errors);
    }
    if let Some(raw) = patch.end_time.as_deref() {
        valid.end_time = parse_time("endTime", raw, &mut errors);
    }
    let start_ok = patch.start_time.is_none() || valid.start_time.is_some();
    let end_ok = patch.end_time.is_none() || valid.end_time.is_some();
    if (patch.start_time.is_some() || patch.end_time.is_some()) && start_ok && end_ok {
        check_order(
            valid.start_time.unwrap_or(current.start_time),
            valid.end_time.unwrap_or(current.end_time),
            &mut errors,
        );
    }
    if let Some(raw) = patch.description.as_deref() {
        valid.description = Some(check_description(raw, &mut errors));
    }
    if let Some(raw) = patch.color.as_deref() {
        valid.color = check_color(raw, &mut errors);
    }
    if let Some(raw) = patch.icon.as_deref() {
        valid.icon = Some(normalize_optional(Some(raw)));
    }

    errors.into_result(valid)
}

/// Range check shared with relocation, which bypasses the string payload.
pub fn validate_range(start: TimeOfDay, end: TimeOfDay) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_order(start, end, &mut errors);
    errors.into_result(())
}

fn check_title(raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    let title = raw.trim();
    if title.is_empty() {
        errors.add("title", "title is required");
        return None;
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        errors.add(
            "title",
            format!("title must be at most {MAX_TITLE_CHARS} characters"),
        );
        return None;
    }
    Some(title.to_string())
}

fn check_description(raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    if raw.chars().count() > MAX_DESCRIPTION_CHARS {
        errors.add(
            "description",
            format!("description must be at most {MAX_DESCRIPTION_CHARS} characters"),
        );
        return None;
    }
    normalize_optional(Some(raw))
}

fn check_color(raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    let color = raw.trim();
    if color.is_empty() {
        errors.add("color", "color cannot be empty");
        return None;
    }
    Some(color.to_string())
}

fn required_time(
    field: &'static str,
    raw: Option<&str>,
    errors: &mut ValidationErrors,
) -> Option<TimeOfDay> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => parse_time(field, raw, errors),
        _ => {
            errors.add(field, format!("{field} is required"));
            None
        }
    }
}

fn parse_time(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<TimeOfDay> {
    match raw.parse::<TimeOfDay>() {
        Ok(time) => Some(time),
        Err(err) => {
            errors.add(field, err.to_string());
            None
        }
    }
}

fn check_order(start: TimeOfDay, end: TimeOfDay, errors: &mut ValidationErrors) {
    if end <= start {
        errors.add("endTime", "end time must be after start time");
    }
}

fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn draft() -> TaskDraft {
        TaskDraft::new("2025-05-01", "Write report", "09:00", "10:00")
    }

    fn existing() -> Task {
        let now = Utc::now();
        Task {
            id: crate::task::TaskId::generate(),
            title: "Existing".into(),
            start_time: "09:00".parse().unwrap(),
            end_time: "10:00".parse().unwrap(),
            description: None,
            color: DEFAULT_COLOR.into(),
            icon: None,
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_draft_gets_default_color() {
        let task = validate_draft(&draft()).unwrap();
        assert_eq!(task.color, DEFAULT_COLOR);
        assert_eq!(task.title, "Write report");
    }

    #[test]
    fn reports_every_failing_field_at_once() {
        let mut bad = draft();
        bad.title = Some("   ".into());
        bad.start_time = Some("9am".into());
        bad.description = Some("x".repeat(501));
        bad.date = None;
        let errors = validate_draft(&bad).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.get("title").is_some());
        assert!(errors.get("startTime").unwrap().contains("9am"));
        assert!(errors.get("description").is_some());
        assert_eq!(errors.get("date"), Some("date is required"));
    }

    #[test]
    fn zero_length_range_is_rejected() {
        let mut bad = draft();
        bad.end_time = Some("09:00".into());
        let errors = validate_draft(&bad).unwrap_err();
        assert_eq!(errors.get("endTime"), Some("end time must be after start time"));
    }

    #[test]
    fn title_limit_counts_characters_not_bytes() {
        let mut ok = draft();
        ok.title = Some("é".repeat(100));
        assert!(validate_draft(&ok).is_ok());
        ok.title = Some("é".repeat(101));
        assert!(validate_draft(&ok).is_err());
    }

    #[test]
    fn patch_validates_only_supplied_fields() {
        let patch = TaskPatch {
            title: Some("New".into()),
            ..TaskPatch::default()
        };
        let valid = validate_patch(&patch, &existing()).unwrap();
        assert_eq!(valid.title.as_deref(), Some("New"));
        assert_eq!(valid.start_time, None);
        assert_eq!(valid.end_time, None);
    }

    #[test]
    fn patch_end_before_existing_start_is_rejected() {
        let patch = TaskPatch {
            end_time: Some("08:30".into()),
            ..TaskPatch::default()
        };
        let errors = validate_patch(&patch, &existing()).unwrap_err();
        assert!(errors.get("endTime").is_some());
    }

    #[test]
    fn empty_description_in_patch_clears_it() {
        let patch = TaskPatch {
            description: Some(String::new()),
            ..TaskPatch::default()
        };
        let valid = validate_patch(&patch, &existing()).unwrap();
        assert_eq!(valid.description, Some(None));
    }
}
