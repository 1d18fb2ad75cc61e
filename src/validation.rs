use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::catalog::Vocabulary;
use crate::models::{
    CapacityError, ClassDetails, ClassForm, ClassKind, ClassTime, ClassType, SeatCapacity,
    SlotCapacity, TimeSlotForm, Weekday,
};

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("regex compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unknown class type '{0}', expected individual, group or mass")]
    UnknownClassType(String),
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("{field} is too large: {value}")]
    TooLarge { field: &'static str, value: i64 },
    #[error("currentStudents ({current}) exceeds maxStudents ({max})")]
    OverCapacity { current: u32, max: u32 },
    #[error("at least one time slot is required")]
    NoTimeSlots,
    #[error("time slot {index}: '{value}' is not a day of the week")]
    InvalidDay { index: usize, value: String },
    #[error("time slot {index}: '{value}' is not a HH:MM time")]
    InvalidTime { index: usize, value: String },
    #[error("time slot {index}: start time {start} must be before end time {end}")]
    EmptyTimeRange {
        index: usize,
        start: String,
        end: String,
    },
    #[error("'{value}' is not a known {field}")]
    UnknownVocabulary { field: &'static str, value: String },
    #[error("image must be an absolute http(s) URL")]
    InvalidImageUrl,
}

impl From<CapacityError> for ValidationError {
    fn from(value: CapacityError) -> Self {
        match value {
            CapacityError::NoSeats => ValidationError::BelowMinimum {
                field: "maxStudents",
                min: 1,
                value: 0,
            },
            CapacityError::OverCapacity { current, max } => {
                ValidationError::OverCapacity { current, max }
            }
        }
    }
}

/// Checks an owner-submitted form and builds the strongly typed listing.
///
/// `carried_enrolment` is the enrolment of the record being edited, used when
/// the form does not state `currentStudents` itself.
pub fn validate_class_form(
    form: ClassForm,
    vocabulary: &Vocabulary,
    carried_enrolment: Option<u32>,
) -> Result<ClassDetails, ValidationError> {
    let kind = validate_kind(&form, carried_enrolment)?;

    let subject = required("subject", form.subject)?;
    if !vocabulary.subjects().iter().any(|s| *s == subject) {
        return Err(ValidationError::UnknownVocabulary {
            field: "subject",
            value: subject,
        });
    }
    let grade = required("grade", form.grade)?;
    if !vocabulary.grades().iter().any(|g| *g == grade) {
        return Err(ValidationError::UnknownVocabulary {
            field: "grade",
            value: grade,
        });
    }
    let description = required("description", form.description)?;
    let price = required("price", form.price)?;
    let phone_number = required("phoneNumber", form.phone_number)?;

    if form.times.is_empty() {
        return Err(ValidationError::NoTimeSlots);
    }
    let times = form
        .times
        .into_iter()
        .enumerate()
        .map(|(index, slot)| validate_time_slot(index, slot, vocabulary))
        .collect::<Result<Vec<_>, _>>()?;

    let image = match form.image.map(|s| s.trim().to_string()) {
        Some(image) if !image.is_empty() => Some(validate_image(image)?),
        _ => None,
    };

    Ok(ClassDetails {
        kind,
        subject,
        grade,
        description,
        times,
        price,
        phone_number,
        image,
    })
}

fn validate_kind(
    form: &ClassForm,
    carried_enrolment: Option<u32>,
) -> Result<ClassKind, ValidationError> {
    let class_type: ClassType = form
        .class_type
        .parse()
        .map_err(|_| ValidationError::UnknownClassType(form.class_type.clone()))?;

    match class_type {
        ClassType::Individual => {
            let available_slots = count("availableSlots", form.available_slots, 0)?;
            Ok(ClassKind::Individual(SlotCapacity { available_slots }))
        }
        ClassType::Group | ClassType::Mass => {
            let max_students = count("maxStudents", form.max_students, 1)?;
            let current_students = match form.current_students {
                Some(_) => count("currentStudents", form.current_students, 0)?,
                None => carried_enrolment.unwrap_or(0),
            };
            let seats = SeatCapacity::new(max_students, current_students)?;
            if class_type == ClassType::Group {
                Ok(ClassKind::Group(seats))
            } else {
                Ok(ClassKind::Mass(seats))
            }
        }
    }
}

fn count(field: &'static str, value: Option<i64>, min: i64) -> Result<u32, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    if value < min {
        return Err(ValidationError::BelowMinimum { field, min, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::TooLarge { field, value })
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn validate_time_slot(
    index: usize,
    slot: TimeSlotForm,
    vocabulary: &Vocabulary,
) -> Result<ClassTime, ValidationError> {
    let day: Weekday = slot.day.parse().map_err(|_| ValidationError::InvalidDay {
        index,
        value: slot.day.clone(),
    })?;
    let start = parse_clock(index, &slot.start_time)?;
    let end = parse_clock(index, &slot.end_time)?;
    if start >= end {
        return Err(ValidationError::EmptyTimeRange {
            index,
            start: slot.start_time,
            end: slot.end_time,
        });
    }

    let location = required("location", slot.location)?;
    if !vocabulary.locations().iter().any(|l| *l == location) {
        return Err(ValidationError::UnknownVocabulary {
            field: "location",
            value: location,
        });
    }

    Ok(ClassTime {
        day,
        start_time: slot.start_time,
        end_time: slot.end_time,
        location,
    })
}

fn parse_clock(index: usize, value: &str) -> Result<NaiveTime, ValidationError> {
    let invalid = || ValidationError::InvalidTime {
        index,
        value: value.to_string(),
    };
    if !CLOCK_TIME.is_match(value) {
        return Err(invalid());
    }
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| invalid())
}

fn validate_image(image: String) -> Result<String, ValidationError> {
    match Url::parse(&image) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(image),
        _ => Err(ValidationError::InvalidImageUrl),
    }
}
