use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

use crate::identity::Identity;
use crate::models::{ClassForm, ClassRecord};
use crate::search::{self, SearchFilters};
use crate::validation::{ValidationError, validate_class_form};

const SUBJECTS: [&str; 13] = [
    "Mathematics",
    "Science",
    "English",
    "Sinhala",
    "Tamil",
    "History",
    "Geography",
    "ICT",
    "Physics",
    "Chemistry",
    "Biology",
    "Accounting",
    "Business Studies",
];

const GRADES: [&str; 15] = [
    "Grade 1", "Grade 2", "Grade 3", "Grade 4", "Grade 5", "Grade 6", "Grade 7", "Grade 8",
    "Grade 9", "Grade 10", "Grade 11", "Grade 12", "Grade 13", "A/L", "O/L",
];

const LOCATIONS: [&str; 10] = [
    "Colombo",
    "Kandy",
    "Gampaha",
    "Kalutara",
    "Galle",
    "Matara",
    "Kurunegala",
    "Anuradhapura",
    "Jaffna",
    "Online",
];

const POPULAR_SEARCHES: [&str; 6] = [
    "Mathematics",
    "Science",
    "English",
    "Grade 10",
    "Colombo",
    "Online Classes",
];

const DEFAULT_TEACHER_NAME: &str = "Teacher";

/// Static reference lists offered by the search box and class form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Vocabulary {
    subjects: Vec<String>,
    grades: Vec<String>,
    locations: Vec<String>,
    #[serde(skip)]
    popular: Vec<String>,
}

impl Vocabulary {
    /// Builds a vocabulary, dropping repeated entries while keeping the
    /// first occurrence in place.
    pub fn new(
        subjects: impl IntoIterator<Item = impl Into<String>>,
        grades: impl IntoIterator<Item = impl Into<String>>,
        locations: impl IntoIterator<Item = impl Into<String>>,
        popular: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            subjects: dedup(subjects),
            grades: dedup(grades),
            locations: dedup(locations),
            popular: dedup(popular),
        }
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn grades(&self) -> &[String] {
        &self.grades
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Curated suggestions shown before anything is typed.
    pub fn popular(&self) -> &[String] {
        &self.popular
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(SUBJECTS, GRADES, LOCATIONS, POPULAR_SEARCHES)
    }
}

fn dedup(items: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.into();
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{email} is not the owner of class {id}")]
    NotOwner { id: String, email: String },
    #[error("class {0} not found")]
    NotFound(String),
}

/// All class listings visible to search, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<ClassRecord>,
    vocabulary: Vocabulary,
}

impl Catalog {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            records: Vec::new(),
            vocabulary,
        }
    }

    /// Catalog preloaded with records, e.g. [`crate::sample_data::sample_classes`].
    /// Records repeating an earlier id are skipped.
    pub fn with_records(vocabulary: Vocabulary, records: Vec<ClassRecord>) -> Self {
        let mut catalog = Self::new(vocabulary);
        for record in records {
            if catalog.get(&record.id).is_none() {
                catalog.records.push(record);
            }
        }
        catalog
    }

    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ClassRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn by_teacher(&self, teacher_id: &str) -> Vec<&ClassRecord> {
        self.records
            .iter()
            .filter(|record| record.teacher_id == teacher_id)
            .collect()
    }

    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<&ClassRecord> {
        search::search(&self.records, query, filters)
    }

    pub fn suggest(&self, partial: &str) -> Vec<String> {
        search::suggest(self, partial)
    }

    /// Publishes a new listing owned by `owner`.
    pub fn create(
        &mut self,
        form: ClassForm,
        owner: &Identity,
    ) -> Result<&ClassRecord, CatalogError> {
        let details = validate_class_form(form, &self.vocabulary, None)?;
        let record = ClassRecord {
            id: uuid::Uuid::new_v4().to_string(),
            teacher_id: owner.uid.clone(),
            teacher_name: owner
                .display_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TEACHER_NAME.to_string()),
            teacher_email: owner.email.clone(),
            details,
            created_at: Utc::now(),
        };
        info!(id = %record.id, teacher = %record.teacher_email, class_type = %record.class_type(), "class created");
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Replaces everything but identity, ownership and creation time.
    pub fn edit(
        &mut self,
        id: &str,
        form: ClassForm,
        acting_email: &str,
    ) -> Result<&ClassRecord, CatalogError> {
        let index = self.owned_index(id, acting_email)?;
        let carried = self.records[index]
            .details
            .kind
            .seats()
            .map(|seats| seats.current_students());
        let details = validate_class_form(form, &self.vocabulary, carried)?;

        let record = &mut self.records[index];
        record.details = details;
        info!(id = %record.id, teacher = %record.teacher_email, "class updated");
        Ok(&*record)
    }

    pub fn delete(&mut self, id: &str, acting_email: &str) -> Result<ClassRecord, CatalogError> {
        let index = self.owned_index(id, acting_email)?;
        let record = self.records.remove(index);
        info!(id = %record.id, teacher = %record.teacher_email, "class deleted");
        Ok(record)
    }

    fn owned_index(&self, id: &str, acting_email: &str) -> Result<usize, CatalogError> {
        let index = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        if !self.records[index].is_owned_by(acting_email) {
            tracing::warn!(id, acting_email, "rejected change by non-owner");
            return Err(CatalogError::NotOwner {
                id: id.to_string(),
                email: acting_email.to_string(),
            });
        }
        Ok(index)
    }
}
