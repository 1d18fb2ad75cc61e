use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    ClassDetails, ClassKind, ClassRecord, ClassTime, SeatCapacity, SlotCapacity, Weekday,
};

fn slot(day: Weekday, start: &str, end: &str, location: &str) -> ClassTime {
    ClassTime {
        day,
        start_time: start.to_string(),
        end_time: end.to_string(),
        location: location.to_string(),
    }
}

fn created(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn seats(max: u32, current: u32) -> SeatCapacity {
    SeatCapacity::new(max, current).expect("fixture capacity within bounds")
}

/// Demo listings loaded at startup when `seed_sample_data` is on.
pub fn sample_classes() -> Vec<ClassRecord> {
    vec![
        ClassRecord {
            id: "1".to_string(),
            teacher_id: "teacher1".to_string(),
            teacher_name: "John Doe".to_string(),
            teacher_email: "john@example.com".to_string(),
            details: ClassDetails {
                kind: ClassKind::Individual(SlotCapacity { available_slots: 3 }),
                subject: "Mathematics".to_string(),
                grade: "Grade 10".to_string(),
                description: "One-on-one mathematics classes focusing on algebra and geometry."
                    .to_string(),
                times: vec![
                    slot(Weekday::Monday, "14:00", "15:00", "Colombo"),
                    slot(Weekday::Wednesday, "16:00", "17:00", "Colombo"),
                ],
                price: "LKR 1500".to_string(),
                phone_number: "0771234567".to_string(),
                image: None,
            },
            created_at: created(2024, 1, 15),
        },
        ClassRecord {
            id: "2".to_string(),
            teacher_id: "teacher2".to_string(),
            teacher_name: "Sarah Smith".to_string(),
            teacher_email: "sarah@example.com".to_string(),
            details: ClassDetails {
                kind: ClassKind::Group(seats(8, 5)),
                subject: "Science".to_string(),
                grade: "Grade 11".to_string(),
                description: "Small group science classes with practical experiments.".to_string(),
                times: vec![
                    slot(Weekday::Tuesday, "15:00", "16:30", "Kandy"),
                    slot(Weekday::Thursday, "15:00", "16:30", "Kandy"),
                ],
                price: "LKR 1000".to_string(),
                phone_number: "0812345678".to_string(),
                image: None,
            },
            created_at: created(2024, 1, 10),
        },
        ClassRecord {
            id: "3".to_string(),
            teacher_id: "teacher3".to_string(),
            teacher_name: "David Wilson".to_string(),
            teacher_email: "david@example.com".to_string(),
            details: ClassDetails {
                kind: ClassKind::Mass(seats(50, 25)),
                subject: "Physics".to_string(),
                grade: "A/L".to_string(),
                description: "Comprehensive A/L physics preparation classes.".to_string(),
                times: vec![
                    slot(Weekday::Saturday, "09:00", "12:00", "Online"),
                    slot(Weekday::Sunday, "09:00", "12:00", "Online"),
                ],
                price: "LKR 800".to_string(),
                phone_number: "0112345678".to_string(),
                image: None,
            },
            created_at: created(2024, 1, 5),
        },
        ClassRecord {
            id: "4".to_string(),
            teacher_id: "teacher1".to_string(),
            teacher_name: "John Doe".to_string(),
            teacher_email: "john@example.com".to_string(),
            details: ClassDetails {
                kind: ClassKind::Individual(SlotCapacity { available_slots: 2 }),
                subject: "English".to_string(),
                grade: "Grade 8".to_string(),
                description: "English language and literature classes.".to_string(),
                times: vec![
                    slot(Weekday::Monday, "10:00", "11:00", "Gampaha"),
                    slot(Weekday::Friday, "14:00", "15:00", "Online"),
                ],
                price: "LKR 1200".to_string(),
                phone_number: "0771234567".to_string(),
                image: None,
            },
            created_at: created(2024, 1, 20),
        },
    ]
}
