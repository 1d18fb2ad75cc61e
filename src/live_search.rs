use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};

use crate::catalog::Catalog;
use crate::debounce::Debouncer;
use crate::models::ClassRecord;
use crate::search::{SearchFilters, VocabularyField, suggest_for_field};

/// Search-as-you-type over a shared catalog.
///
/// Every query or filter change reschedules the search; results are
/// published on a watch channel once the input has been stable for the
/// debounce delay.
pub struct LiveSearch {
    catalog: Arc<RwLock<Catalog>>,
    debouncer: Debouncer,
    query: String,
    filters: SearchFilters,
    results: watch::Sender<Vec<ClassRecord>>,
}

impl LiveSearch {
    pub fn new(catalog: Arc<RwLock<Catalog>>, delay: Duration) -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self {
            catalog,
            debouncer: Debouncer::new(delay),
            query: String::new(),
            filters: SearchFilters::default(),
            results,
        }
    }

    pub fn results(&self) -> watch::Receiver<Vec<ClassRecord>> {
        self.results.subscribe()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.reschedule();
    }

    pub fn set_filters(&mut self, filters: SearchFilters) {
        self.filters = filters;
        self.reschedule();
    }

    /// Runs the search immediately, dropping any pending debounced run.
    pub async fn search_now(&mut self) -> Vec<ClassRecord> {
        self.debouncer.cancel();
        let results = run_search(&self.catalog, &self.query, &self.filters).await;
        self.results.send_replace(results.clone());
        results
    }

    /// Clears the query and every filter and empties the result list.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.query.clear();
        self.filters = SearchFilters::default();
        self.results.send_replace(Vec::new());
    }

    /// Autocomplete for the current query. Not debounced.
    pub async fn suggestions(&self) -> Vec<String> {
        self.catalog.read().await.suggest(&self.query)
    }

    /// Dropdown entries for one filter field given its current text.
    pub async fn field_suggestions(&self, field: VocabularyField, text: &str) -> Vec<String> {
        let catalog = self.catalog.read().await;
        suggest_for_field(catalog.vocabulary(), field, text)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn reschedule(&mut self) {
        let catalog = self.catalog.clone();
        let query = self.query.clone();
        let filters = self.filters.clone();
        let results = self.results.clone();
        self.debouncer.schedule(async move {
            let found = run_search(&catalog, &query, &filters).await;
            results.send_replace(found);
        });
    }
}

async fn run_search(
    catalog: &RwLock<Catalog>,
    query: &str,
    filters: &SearchFilters,
) -> Vec<ClassRecord> {
    let catalog = catalog.read().await;
    catalog
        .search(query, filters)
        .into_iter()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Vocabulary;
    use crate::models::ClassType;
    use crate::sample_data::sample_classes;

    fn shared_catalog() -> Arc<RwLock<Catalog>> {
        Arc::new(RwLock::new(Catalog::with_records(
            Vocabulary::default(),
            sample_classes(),
        )))
    }

    fn ids(records: &[ClassRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_last_input_after_quiet_period() {
        let mut live = LiveSearch::new(shared_catalog(), Duration::from_millis(300));
        let mut rx = live.results();

        live.set_query("J");
        tokio::time::sleep(Duration::from_millis(100)).await;
        live.set_query("Jo");
        tokio::time::sleep(Duration::from_millis(100)).await;
        live.set_filters(SearchFilters::default().subject("English"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!rx.has_changed().unwrap());

        rx.changed().await.unwrap();
        assert_eq!(ids(&rx.borrow_and_update()), ["4"]);
        assert_eq!(live.query(), "Jo");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_now_and_clear() {
        let mut live = LiveSearch::new(shared_catalog(), Duration::from_millis(300));
        let rx = live.results();

        live.set_filters(SearchFilters::default().class_type(ClassType::Group));
        let found = live.search_now().await;
        assert_eq!(ids(&found), ["2"]);
        assert_eq!(ids(&rx.borrow()), ["2"]);

        live.set_query("physics");
        live.clear();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.borrow().is_empty());
        assert_eq!(live.filters(), &SearchFilters::default());
    }

    #[tokio::test]
    async fn test_suggestions_track_query() {
        let mut live = LiveSearch::new(shared_catalog(), Duration::from_millis(300));
        assert_eq!(live.suggestions().await.len(), 6);
        live.set_query("sarah");
        assert_eq!(live.suggestions().await, ["Sarah Smith"]);
        assert_eq!(
            live.field_suggestions(VocabularyField::Location, "col").await,
            ["Colombo"]
        );
    }
}
