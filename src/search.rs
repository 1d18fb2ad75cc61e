//! Catalog search and autocomplete.
//!
//! Everything here is a pure function of its inputs. Callers re-run it on
//! every input change; nothing is cached between calls.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::{Catalog, Vocabulary};
use crate::models::{ClassRecord, ClassType};

pub const MAX_SUGGESTIONS: usize = 8;

/// Exact-match constraints applied on top of the free-text query.
///
/// `None` and the empty string both mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub subject: Option<String>,
    pub grade: Option<String>,
    /// Matches when any of the class's time slots is held at this location.
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub class_type: Option<ClassType>,
}

impl SearchFilters {
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn class_type(mut self, class_type: ClassType) -> Self {
        self.class_type = Some(class_type);
        self
    }

    pub fn matches(&self, record: &ClassRecord) -> bool {
        let details = &record.details;
        active(&self.subject).is_none_or(|subject| details.subject == subject)
            && active(&self.grade).is_none_or(|grade| details.grade == grade)
            && active(&self.location)
                .is_none_or(|location| details.times.iter().any(|t| t.location == location))
            && self
                .class_type
                .is_none_or(|class_type| record.class_type() == class_type)
    }
}

fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|value| !value.is_empty())
}

/// Free-text predicate. Looks at subject, grade, teacher name and
/// description only; slot locations are reachable through the location
/// filter, not through the query.
pub fn matches_query(record: &ClassRecord, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_ascii_lowercase();
    [
        record.details.subject.as_str(),
        record.details.grade.as_str(),
        record.teacher_name.as_str(),
        record.details.description.as_str(),
    ]
    .into_iter()
    .any(|field| contains_ignore_case(field, &needle))
}

/// Records matching `query` and every active filter, in catalog order.
pub fn search<'a>(
    records: &'a [ClassRecord],
    query: &str,
    filters: &SearchFilters,
) -> Vec<&'a ClassRecord> {
    let results: Vec<&ClassRecord> = records
        .iter()
        .filter(|record| matches_query(record, query) && filters.matches(record))
        .collect();
    tracing::debug!(query, ?filters, matches = results.len(), "catalog search");
    results
}

/// Autocomplete candidates for the main search box.
///
/// Blank input yields the curated popular list. Otherwise subjects, grades,
/// teacher names and locations are scanned in that order and the first
/// [`MAX_SUGGESTIONS`] distinct hits are returned.
pub fn suggest(catalog: &Catalog, partial: &str) -> Vec<String> {
    let vocabulary = catalog.vocabulary();
    if partial.trim().is_empty() {
        return vocabulary
            .popular()
            .iter()
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect();
    }

    let needle = partial.to_ascii_lowercase();
    let candidates = vocabulary
        .subjects()
        .iter()
        .chain(vocabulary.grades())
        .chain(catalog.records().iter().map(|record| &record.teacher_name))
        .chain(vocabulary.locations());

    let mut suggestions: Vec<String> = Vec::with_capacity(MAX_SUGGESTIONS);
    for candidate in candidates {
        if suggestions.len() == MAX_SUGGESTIONS {
            break;
        }
        if contains_ignore_case(candidate, &needle) && !suggestions.contains(candidate) {
            suggestions.push(candidate.clone());
        }
    }
    suggestions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyField {
    Subject,
    Grade,
    Location,
}

/// Dropdown suggestions for one filter field: the whole vocabulary while
/// the field is blank, otherwise the entries containing `text`.
pub fn suggest_for_field<'a>(
    vocabulary: &'a Vocabulary,
    field: VocabularyField,
    text: &str,
) -> Vec<&'a str> {
    let entries = match field {
        VocabularyField::Subject => vocabulary.subjects(),
        VocabularyField::Grade => vocabulary.grades(),
        VocabularyField::Location => vocabulary.locations(),
    };
    let needle = text.to_ascii_lowercase();
    entries
        .iter()
        .map(String::as_str)
        .filter(|entry| text.trim().is_empty() || contains_ignore_case(entry, &needle))
        .collect()
}

fn contains_ignore_case(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(lowered_needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_data::sample_classes;

    fn catalog() -> Catalog {
        Catalog::with_records(Vocabulary::default(), sample_classes())
    }

    fn ids(records: Vec<&ClassRecord>) -> Vec<&str> {
        records.into_iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_and_filters_return_everything_in_order() {
        let catalog = catalog();
        let all = catalog.search("", &SearchFilters::default());
        assert_eq!(ids(all), ["1", "2", "3", "4"]);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::default();
        assert!(catalog.search("", &SearchFilters::default()).is_empty());
        assert!(catalog.search("math", &SearchFilters::default()).is_empty());
    }

    #[test]
    fn test_query_matches_case_insensitively() {
        let catalog = catalog();
        assert_eq!(ids(catalog.search("John", &SearchFilters::default())), ["1", "4"]);
        assert_eq!(ids(catalog.search("mathematics", &SearchFilters::default())), ["1"]);
        assert_eq!(ids(catalog.search("a/l", &SearchFilters::default())), ["3"]);
        assert_eq!(ids(catalog.search("EXPERIMENTS", &SearchFilters::default())), ["2"]);
        assert!(catalog.search("zzz-no-match", &SearchFilters::default()).is_empty());
    }

    #[test]
    fn test_query_does_not_look_at_slot_locations() {
        let catalog = catalog();
        assert!(catalog.search("Kandy", &SearchFilters::default()).is_empty());
        let by_filter = catalog.search("", &SearchFilters::default().location("Kandy"));
        assert_eq!(ids(by_filter), ["2"]);
    }

    #[test]
    fn test_filters() {
        let catalog = catalog();
        let physics = SearchFilters::default().subject("Physics");
        assert_eq!(ids(catalog.search("", &physics)), ["3"]);

        let group = SearchFilters::default().class_type(ClassType::Group);
        assert_eq!(ids(catalog.search("", &group)), ["2"]);

        let online = SearchFilters::default().location("Online");
        assert_eq!(ids(catalog.search("", &online)), ["3", "4"]);

        let case_sensitive = SearchFilters::default().subject("physics");
        assert!(catalog.search("", &case_sensitive).is_empty());
    }

    #[test]
    fn test_blank_filter_values_are_inactive() {
        let catalog = catalog();
        let filters = SearchFilters {
            subject: Some(String::new()),
            grade: Some(String::new()),
            location: Some(String::new()),
            class_type: None,
        };
        assert_eq!(catalog.search("", &filters).len(), 4);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let catalog = catalog();
        let both = SearchFilters::default().subject("English").location("Online");
        assert_eq!(ids(catalog.search("john", &both)), ["4"]);

        let subject_only = ids(catalog.search("john", &SearchFilters::default().subject("English")));
        let location_only = ids(catalog.search("john", &SearchFilters::default().location("Online")));
        for id in ids(catalog.search("john", &both)) {
            assert!(subject_only.contains(&id));
            assert!(location_only.contains(&id));
        }

        let none = SearchFilters::default()
            .subject("Physics")
            .class_type(ClassType::Individual);
        assert!(catalog.search("", &none).is_empty());
    }

    #[test]
    fn test_blank_input_suggests_popular_searches() {
        let catalog = catalog();
        let expected = [
            "Mathematics",
            "Science",
            "English",
            "Grade 10",
            "Colombo",
            "Online Classes",
        ];
        assert_eq!(catalog.suggest(""), expected);
        assert_eq!(catalog.suggest("   "), expected);
        assert_eq!(Catalog::default().suggest(""), expected);
    }

    #[test]
    fn test_suggestions_follow_scan_order_and_dedupe() {
        let catalog = catalog();
        assert_eq!(catalog.suggest("john"), ["John Doe"]);
        assert_eq!(catalog.suggest("ma"), ["Mathematics", "Matara"]);
        assert_eq!(catalog.suggest("on"), ["David Wilson", "Online"]);
    }

    #[test]
    fn test_suggestions_are_capped() {
        let catalog = catalog();
        let grades = catalog.suggest("grade");
        assert_eq!(grades.len(), MAX_SUGGESTIONS);
        assert_eq!(grades[0], "Grade 1");
        assert_eq!(grades[7], "Grade 8");
    }

    #[test]
    fn test_every_suggestion_contains_the_input() {
        let catalog = catalog();
        for partial in ["a", "o", "l", "Gr", "e ", "x"] {
            let suggestions = catalog.suggest(partial);
            assert!(suggestions.len() <= MAX_SUGGESTIONS);
            for (i, s) in suggestions.iter().enumerate() {
                assert!(s.to_ascii_lowercase().contains(&partial.to_ascii_lowercase()));
                assert!(!suggestions[..i].contains(s));
            }
        }
    }

    #[test]
    fn test_field_suggestions() {
        let vocabulary = Vocabulary::default();
        assert_eq!(
            suggest_for_field(&vocabulary, VocabularyField::Location, "").len(),
            vocabulary.locations().len()
        );
        assert_eq!(
            suggest_for_field(&vocabulary, VocabularyField::Location, "an"),
            ["Kandy", "Anuradhapura"]
        );
        assert_eq!(
            suggest_for_field(&vocabulary, VocabularyField::Grade, "1").len(),
            5
        );
        assert_eq!(
            suggest_for_field(&vocabulary, VocabularyField::Subject, "STUD"),
            ["Business Studies"]
        );
    }
}
