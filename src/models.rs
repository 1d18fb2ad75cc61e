use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or(())
    }
}

/// One weekly meeting of a class. Location lives here, not on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassTime {
    pub day: Weekday,
    #[schema(example = "14:00")]
    pub start_time: String,
    #[schema(example = "15:00")]
    pub end_time: String,
    #[schema(example = "Colombo")]
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassType {
    Individual,
    Group,
    Mass,
}

impl ClassType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassType::Individual => "individual",
            ClassType::Group => "group",
            ClassType::Mass => "mass",
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown class type '{0}', expected individual, group or mass")]
pub struct UnknownClassType(pub String);

impl FromStr for ClassType {
    type Err = UnknownClassType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(ClassType::Individual),
            "group" => Ok(ClassType::Group),
            "mass" => Ok(ClassType::Mass),
            other => Err(UnknownClassType(other.to_string())),
        }
    }
}

/// Capacity of a one-on-one class: how many more students can book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotCapacity {
    pub available_slots: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("maxStudents must be at least 1")]
    NoSeats,
    #[error("currentStudents ({current}) exceeds maxStudents ({max})")]
    OverCapacity { current: u32, max: u32 },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeatCapacity {
    max_students: u32,
    current_students: u32,
}

/// Seat-based capacity shared by group and mass classes.
///
/// `current_students <= max_students` and `max_students >= 1` hold for every
/// value, including deserialized ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatCapacity {
    max_students: u32,
    current_students: u32,
}

impl SeatCapacity {
    pub fn new(max_students: u32, current_students: u32) -> Result<Self, CapacityError> {
        if max_students == 0 {
            return Err(CapacityError::NoSeats);
        }
        if current_students > max_students {
            return Err(CapacityError::OverCapacity {
                current: current_students,
                max: max_students,
            });
        }
        Ok(Self {
            max_students,
            current_students,
        })
    }

    pub fn max_students(&self) -> u32 {
        self.max_students
    }

    pub fn current_students(&self) -> u32 {
        self.current_students
    }

    pub fn remaining(&self) -> u32 {
        self.max_students - self.current_students
    }

    /// Enrolment as a rounded percentage of the seat count.
    pub fn fill_percent(&self) -> u32 {
        let max = u64::from(self.max_students);
        let current = u64::from(self.current_students);
        // max >= 1 and current <= max keep this within 0..=100
        ((current * 200 + max) / (max * 2)) as u32
    }
}

impl<'de> Deserialize<'de> for SeatCapacity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSeatCapacity::deserialize(deserializer)?;
        SeatCapacity::new(raw.max_students, raw.current_students).map_err(de::Error::custom)
    }
}

/// The variant part of a listing. Each variant carries only its own
/// capacity fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClassKind {
    Individual(SlotCapacity),
    Group(SeatCapacity),
    Mass(SeatCapacity),
}

impl ClassKind {
    pub fn class_type(&self) -> ClassType {
        match self {
            ClassKind::Individual(_) => ClassType::Individual,
            ClassKind::Group(_) => ClassType::Group,
            ClassKind::Mass(_) => ClassType::Mass,
        }
    }

    pub fn seats(&self) -> Option<&SeatCapacity> {
        match self {
            ClassKind::Individual(_) => None,
            ClassKind::Group(seats) | ClassKind::Mass(seats) => Some(seats),
        }
    }

    pub fn has_vacancy(&self) -> bool {
        match self {
            ClassKind::Individual(slots) => slots.available_slots > 0,
            ClassKind::Group(seats) | ClassKind::Mass(seats) => seats.remaining() > 0,
        }
    }

    pub fn capacity(&self) -> CapacitySummary {
        let seats = self.seats();
        CapacitySummary {
            has_vacancy: self.has_vacancy(),
            remaining_seats: seats.map(SeatCapacity::remaining),
            fill_percent: seats.map(SeatCapacity::fill_percent),
        }
    }
}

/// Derived capacity figures rendered on a listing card. Seat figures are
/// only present for group and mass classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySummary {
    pub has_vacancy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seats: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_percent: Option<u32>,
}

/// Everything the owning teacher may replace when editing a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetails {
    #[serde(flatten)]
    pub kind: ClassKind,
    pub subject: String,
    pub grade: String,
    pub description: String,
    pub times: Vec<ClassTime>,
    #[schema(example = "LKR 1500")]
    pub price: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub teacher_email: String,
    #[serde(flatten)]
    pub details: ClassDetails,
    #[schema(value_type = String, format = "date-time", example = "2024-01-15T00:00:00Z")]
    pub created_at: DateTime<Utc>,
}

impl ClassRecord {
    pub fn class_type(&self) -> ClassType {
        self.details.kind.class_type()
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        self.teacher_email == email
    }
}

/// A record as served over HTTP, with its capacity summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ClassListing {
    #[serde(flatten)]
    pub record: ClassRecord,
    pub capacity: CapacitySummary,
}

impl From<ClassRecord> for ClassListing {
    fn from(record: ClassRecord) -> Self {
        let capacity = record.details.kind.capacity();
        Self { record, capacity }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotForm {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub location: String,
}

/// A listing as submitted by its owner. Loosely typed on purpose: it is
/// turned into [`ClassDetails`] by [`crate::validation::validate_class_form`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassForm {
    #[serde(rename = "type", default)]
    #[schema(example = "group")]
    pub class_type: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub times: Vec<TimeSlotForm>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub max_students: Option<i64>,
    #[serde(default)]
    pub current_students: Option<i64>,
    #[serde(default)]
    pub available_slots: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ClassKind) -> ClassRecord {
        ClassRecord {
            id: "1".to_string(),
            teacher_id: "teacher1".to_string(),
            teacher_name: "John Doe".to_string(),
            teacher_email: "john@example.com".to_string(),
            details: ClassDetails {
                kind,
                subject: "Mathematics".to_string(),
                grade: "Grade 10".to_string(),
                description: "Algebra".to_string(),
                times: vec![ClassTime {
                    day: Weekday::Monday,
                    start_time: "14:00".to_string(),
                    end_time: "15:00".to_string(),
                    location: "Colombo".to_string(),
                }],
                price: "LKR 1500".to_string(),
                phone_number: "0771234567".to_string(),
                image: None,
            },
            created_at: DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_seat_capacity_bounds() {
        assert!(SeatCapacity::new(8, 5).is_ok());
        assert!(SeatCapacity::new(8, 8).is_ok());
        assert_eq!(SeatCapacity::new(0, 0), Err(CapacityError::NoSeats));
        assert_eq!(
            SeatCapacity::new(8, 9),
            Err(CapacityError::OverCapacity { current: 9, max: 8 })
        );
    }

    #[test]
    fn test_fill_percent_rounds() {
        assert_eq!(SeatCapacity::new(8, 5).unwrap().fill_percent(), 63);
        assert_eq!(SeatCapacity::new(50, 25).unwrap().fill_percent(), 50);
        assert_eq!(SeatCapacity::new(3, 3).unwrap().fill_percent(), 100);
        assert_eq!(SeatCapacity::new(3, 0).unwrap().fill_percent(), 0);
    }

    #[test]
    fn test_vacancy_per_variant() {
        assert!(ClassKind::Individual(SlotCapacity { available_slots: 1 }).has_vacancy());
        assert!(!ClassKind::Individual(SlotCapacity { available_slots: 0 }).has_vacancy());
        assert!(!ClassKind::Mass(SeatCapacity::new(2, 2).unwrap()).has_vacancy());
        assert!(ClassKind::Group(SeatCapacity::new(2, 1).unwrap()).has_vacancy());
    }

    #[test]
    fn test_record_serializes_only_its_variant_fields() {
        let json = serde_json::to_value(record(ClassKind::Individual(SlotCapacity {
            available_slots: 3,
        })))
        .unwrap();
        assert_eq!(json["type"], "individual");
        assert_eq!(json["availableSlots"], 3);
        assert_eq!(json["teacherEmail"], "john@example.com");
        assert_eq!(json["times"][0]["startTime"], "14:00");
        assert!(json.get("maxStudents").is_none());
        assert!(json.get("image").is_none());

        let json = serde_json::to_value(record(ClassKind::Group(
            SeatCapacity::new(8, 5).unwrap(),
        )))
        .unwrap();
        assert_eq!(json["type"], "group");
        assert_eq!(json["maxStudents"], 8);
        assert_eq!(json["currentStudents"], 5);
        assert!(json.get("availableSlots").is_none());
    }

    #[test]
    fn test_listing_carries_capacity_summary() {
        let json = serde_json::to_value(ClassListing::from(record(ClassKind::Group(
            SeatCapacity::new(8, 5).unwrap(),
        ))))
        .unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["maxStudents"], 8);
        assert_eq!(json["capacity"]["hasVacancy"], true);
        assert_eq!(json["capacity"]["remainingSeats"], 3);
        assert_eq!(json["capacity"]["fillPercent"], 63);

        let json = serde_json::to_value(ClassListing::from(record(ClassKind::Individual(
            SlotCapacity { available_slots: 0 },
        ))))
        .unwrap();
        assert_eq!(json["capacity"]["hasVacancy"], false);
        assert!(json["capacity"].get("fillPercent").is_none());
        assert!(json["capacity"].get("remainingSeats").is_none());
    }

    #[test]
    fn test_deserialize_rejects_over_capacity() {
        let mut json = serde_json::to_value(record(ClassKind::Mass(
            SeatCapacity::new(50, 25).unwrap(),
        )))
        .unwrap();
        let parsed: ClassRecord = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed.class_type(), ClassType::Mass);

        json["currentStudents"] = serde_json::json!(51);
        assert!(serde_json::from_value::<ClassRecord>(json).is_err());
    }

    #[test]
    fn test_class_type_from_str() {
        assert_eq!("group".parse::<ClassType>(), Ok(ClassType::Group));
        assert!("Group".parse::<ClassType>().is_err());
        assert_eq!("Sunday".parse::<Weekday>(), Ok(Weekday::Sunday));
        assert!("Funday".parse::<Weekday>().is_err());
    }
}
