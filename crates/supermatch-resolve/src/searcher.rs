//! Multi-criteria supervisor search.
//!
//! Each criterion is embedded (concurrently, through the cache) and scored
//! against stored vectors of its own field. Scores are merged per supervisor
//! as the mean over the fields that matched, so a supervisor matched on one of
//! three criteria is scored on that one alone.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::types::*;
use supermatch_core::{Error, FieldType, Result};
use supermatch_infer::EmbeddingCache;
use supermatch_store::SqliteStore;

pub struct MultiCriteriaSearcher {
    cache: Arc<EmbeddingCache>,
    store: Arc<SqliteStore>,
}

impl MultiCriteriaSearcher {
    pub fn new(cache: Arc<EmbeddingCache>) -> Self {
        let store = cache.store().clone();
        Self { cache, store }
    }

    /// Run an HTTP-shaped query and join results with stored profiles.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let limit = query.resolved_limit()?;
        let ranking = self.score(&query.criteria()).await?;
        self.hydrate(ranking, limit)
    }

    /// Single-criterion search on research interests.
    pub async fn search_research_interests(&self, text: &str, limit: usize) -> Result<SearchResponse> {
        let mut criteria = BTreeMap::new();
        criteria.insert(FieldType::ResearchInterests, text.to_string());
        check_limit(limit)?;
        let ranking = self.score(&criteria).await?;
        self.hydrate(ranking, limit)
    }

    /// Rank supervisors for a set of per-field query texts.
    pub async fn rank(&self, criteria: &BTreeMap<FieldType, String>, limit: usize) -> Result<Ranking> {
        check_limit(limit)?;
        let mut ranking = self.score(criteria).await?;
        ranking.hits.truncate(limit);
        Ok(ranking)
    }

    /// Every supervisor that matched any criterion, best first.
    async fn score(&self, criteria: &BTreeMap<FieldType, String>) -> Result<Ranking> {
        let criteria: Vec<(FieldType, &str)> = criteria
            .iter()
            .map(|(field, text)| (*field, text.trim()))
            .filter(|(_, text)| !text.is_empty())
            .collect();
        if criteria.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one search criterion is required".into(),
            ));
        }

        let embeddings = join_all(criteria.iter().map(|(field, text)| async move {
            (*field, self.cache.get_or_create(text).await)
        }))
        .await;

        let mut degraded_criteria = Vec::new();
        let mut merged: HashMap<String, (f64, Vec<FieldType>)> = HashMap::new();
        for (field, embedding) in embeddings {
            let embedding = embedding?;
            if embedding.is_degraded() {
                warn!("Skipping {} criterion: embedding unavailable", field);
                degraded_criteria.push(field);
                continue;
            }
            let scores = self.store.field_similarities(field, &embedding.vector)?;
            debug!("{} criterion scored {} supervisors", field, scores.len());
            for score in scores {
                let entry = merged.entry(score.supervisor_id).or_default();
                entry.0 += score.similarity;
                entry.1.push(field);
            }
        }

        let mut hits: Vec<RankedSupervisor> = merged
            .into_iter()
            .map(|(supervisor_id, (sum, mut fields))| {
                fields.sort();
                RankedSupervisor {
                    supervisor_id,
                    similarity: round4(sum / fields.len() as f64),
                    matched_criteria: fields,
                }
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.supervisor_id.cmp(&b.supervisor_id))
        });

        Ok(Ranking {
            hits,
            degraded_criteria,
        })
    }

    /// Rank individual stored interests against `text`.
    pub async fn interest_matches(&self, text: &str, limit: usize) -> Result<InterestMatches> {
        check_limit(limit)?;
        let embedding = self.cache.get_or_create(text).await?;
        if embedding.is_degraded() {
            return Ok(InterestMatches {
                count: 0,
                matches: Vec::new(),
                degraded: true,
            });
        }
        let matches = self.store.interest_similarities(&embedding.vector, limit)?;
        Ok(InterestMatches {
            count: matches.len(),
            matches,
            degraded: false,
        })
    }

    /// Join ranked hits with their profiles until `limit` are found. Hits whose
    /// supervisor was deleted mid-search are passed over, not counted.
    fn hydrate(&self, ranking: Ranking, limit: usize) -> Result<SearchResponse> {
        let mut supervisors = Vec::with_capacity(limit.min(ranking.hits.len()));
        for hit in ranking.hits {
            if supervisors.len() == limit {
                break;
            }
            match self.store.get_supervisor(&hit.supervisor_id)? {
                Some(supervisor) => supervisors.push(MatchedSupervisor::from_ranked(supervisor, hit)),
                None => debug!("Supervisor {} vanished before hydration", hit.supervisor_id),
            }
        }
        Ok(SearchResponse {
            count: supervisors.len(),
            supervisors,
            degraded_criteria: ranking.degraded_criteria,
        })
    }
}

fn check_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::InvalidRequest("limit must be a positive integer".into()));
    }
    Ok(())
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use serde_json::json;
    use supermatch_index::ProfileIndexer;
    use supermatch_infer::testing::StaticProvider;
    use supermatch_store::embedding::cosine_similarity;
    use tempfile::TempDir;

    const DIM: usize = 4;

    struct Harness {
        dir: TempDir,
        provider: Arc<StaticProvider>,
        indexer: ProfileIndexer,
        searcher: MultiCriteriaSearcher,
        cache: Arc<EmbeddingCache>,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path(), DIM).unwrap());
        let provider = Arc::new(StaticProvider::new(DIM));
        let cache = Arc::new(EmbeddingCache::new(store, provider.clone()).unwrap());
        Harness {
            dir,
            provider,
            indexer: ProfileIndexer::new(cache.clone()),
            searcher: MultiCriteriaSearcher::new(cache.clone()),
            cache,
        }
    }

    fn query(research: Option<&str>, expertise: Option<&str>, limit: Option<i64>) -> SearchQuery {
        SearchQuery {
            research_interests: research.map(String::from),
            expertise: expertise.map(String::from),
            keywords: None,
            limit,
        }
    }

    #[tokio::test]
    async fn test_single_interest_example() {
        let h = harness();
        h.provider.set("X Y", array![1.0, 1.0, 0.0, 0.0]);
        h.provider.set("X", array![1.0, 0.0, 0.0, 0.0]);
        h.indexer
            .index_profile(&json!({"id": "a", "research_interests": ["X", "Y"]}))
            .await
            .unwrap();

        let response = h.searcher.search(&query(Some("X"), None, Some(1))).await.unwrap();

        assert_eq!(response.count, 1);
        let hit = &response.supervisors[0];
        assert_eq!(hit.id, "a");
        assert_eq!(hit.matched_criteria, vec![FieldType::ResearchInterests]);

        let x = h.cache.get_or_create("X").await.unwrap().vector;
        let stored = h
            .cache
            .store()
            .get_field_embedding("a", FieldType::ResearchInterests)
            .unwrap()
            .unwrap();
        let expected = round4(cosine_similarity(&x, &stored).unwrap());
        assert_eq!(hit.similarity, expected);
        assert_eq!(hit.similarity, 0.7071);
    }

    #[tokio::test]
    async fn test_partial_match_scored_on_matched_field_only() {
        let h = harness();
        h.provider.set("ml", array![1.0, 0.0, 0.0, 0.0]);
        h.provider.set("stats", array![0.0, 1.0, 0.0, 0.0]);
        h.provider.set("q-ml", array![1.0, 0.0, 0.0, 0.0]);
        h.provider.set("q-stats", array![0.6, 0.8, 0.0, 0.0]);
        h.indexer
            .index_profile(&json!({"id": "both", "research_interests": "ml", "expertise": "stats"}))
            .await
            .unwrap();
        h.indexer
            .index_profile(&json!({"id": "expert-only", "expertise": "stats"}))
            .await
            .unwrap();

        let response = h
            .searcher
            .search(&query(Some("q-ml"), Some("q-stats"), None))
            .await
            .unwrap();

        let only = response.supervisors.iter().find(|s| s.id == "expert-only").unwrap();
        assert_eq!(only.matched_criteria, vec![FieldType::Expertise]);
        assert_eq!(only.similarity, 0.8);

        let both = response.supervisors.iter().find(|s| s.id == "both").unwrap();
        assert_eq!(
            both.matched_criteria,
            vec![FieldType::ResearchInterests, FieldType::Expertise]
        );
        assert_eq!(both.similarity, 0.9);
        assert_eq!(response.supervisors[0].id, "both");
    }

    #[tokio::test]
    async fn test_sorted_descending_with_id_tie_break() {
        let h = harness();
        let same: Array1<f32> = array![0.8, 0.6, 0.0, 0.0];
        h.provider.set("beta topic", same.clone());
        h.provider.set("alpha topic", same);
        h.provider.set("far topic", array![0.0, 0.0, 1.0, 0.0]);
        h.provider.set("query", array![1.0, 0.0, 0.0, 0.0]);
        for (id, text) in [("beta", "beta topic"), ("zeta", "far topic"), ("alpha", "alpha topic")] {
            h.indexer
                .index_profile(&json!({"id": id, "expertise": text}))
                .await
                .unwrap();
        }

        let response = h.searcher.search(&query(None, Some("query"), Some(10))).await.unwrap();
        let ids: Vec<&str> = response.supervisors.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta", "zeta"]);
        assert_eq!(response.supervisors[0].similarity, 0.8);
        assert_eq!(response.supervisors[1].similarity, 0.8);
        assert!(response
            .supervisors
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn test_limit_truncates_and_defaults() {
        let h = harness();
        for i in 0..7 {
            h.indexer
                .index_profile(&json!({"id": format!("s{}", i), "expertise": format!("topic {}", i)}))
                .await
                .unwrap();
        }

        let defaulted = h.searcher.search(&query(None, Some("topic"), None)).await.unwrap();
        assert_eq!(defaulted.count, 5);

        let two = h.searcher.search(&query(None, Some("topic"), Some(2))).await.unwrap();
        assert_eq!(two.supervisors.len(), 2);

        let err = h.searcher.search(&query(None, Some("topic"), Some(0))).await.unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[tokio::test]
    async fn test_no_criteria_is_invalid_request() {
        let h = harness();
        let err = h.searcher.search(&SearchQuery::default()).await.unwrap_err();
        assert!(err.is_invalid_request());

        let err = h
            .searcher
            .search(&query(Some("   "), Some(""), None))
            .await
            .unwrap_err();
        assert!(err.is_invalid_request());
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_degraded_criteria_are_reported() {
        let h = harness();
        h.indexer
            .index_profile(&json!({"id": "a", "expertise": "vision"}))
            .await
            .unwrap();
        h.provider.set_failing(true);

        let response = h
            .searcher
            .search(&query(Some("anything"), Some("else"), None))
            .await
            .unwrap();

        assert_eq!(response.count, 0);
        assert_eq!(
            response.degraded_criteria,
            vec![FieldType::ResearchInterests, FieldType::Expertise]
        );
    }

    #[tokio::test]
    async fn test_interest_matches_rank_items() {
        let h = harness();
        h.provider.set("Robotics", array![1.0, 0.0, 0.0, 0.0]);
        h.provider.set("Poetry", array![0.0, 1.0, 0.0, 0.0]);
        h.provider.set("robots", array![0.9, 0.1, 0.0, 0.0]);
        h.indexer
            .index_profile(&json!({"id": "r", "research_interests": ["Robotics", "Poetry"]}))
            .await
            .unwrap();

        let result = h.searcher.interest_matches("robots", 1).await.unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.matches[0].supervisor_id, "r");
        assert_eq!(result.matches[0].interest, "Robotics");
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn test_search_research_interests_matches_full_search() {
        let h = harness();
        h.indexer
            .index_profile(&json!({"id": "a", "research_interests": ["NLP"]}))
            .await
            .unwrap();

        let single = h.searcher.search_research_interests("NLP", 3).await.unwrap();
        let full = h.searcher.search(&query(Some("NLP"), None, Some(3))).await.unwrap();
        assert_eq!(single.count, 1);
        assert_eq!(single.supervisors[0].similarity, full.supervisors[0].similarity);
        assert_eq!(single.supervisors[0].similarity, 1.0);
    }

    #[tokio::test]
    async fn test_vanished_supervisor_does_not_shrink_results() {
        let h = harness();
        for id in ["a", "b", "c"] {
            h.indexer
                .index_profile(&json!({"id": id, "expertise": "topic"}))
                .await
                .unwrap();
        }
        let hit = |id: &str, similarity: f64| RankedSupervisor {
            supervisor_id: id.to_string(),
            similarity,
            matched_criteria: vec![FieldType::Expertise],
        };
        let ranking = Ranking {
            hits: vec![hit("gone", 0.99), hit("a", 0.9), hit("b", 0.8), hit("c", 0.7)],
            degraded_criteria: Vec::new(),
        };

        let response = h.searcher.hydrate(ranking, 2).unwrap();
        let ids: Vec<&str> = response.supervisors.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(response.count, 2);
    }

    #[tokio::test]
    async fn test_rank_still_truncates_to_limit() {
        let h = harness();
        for i in 0..4 {
            h.indexer
                .index_profile(&json!({"id": format!("s{}", i), "expertise": "topic"}))
                .await
                .unwrap();
        }
        let mut criteria = BTreeMap::new();
        criteria.insert(FieldType::Expertise, "topic".to_string());

        let ranking = h.searcher.rank(&criteria, 3).await.unwrap();
        assert_eq!(ranking.hits.len(), 3);
    }

    #[tokio::test]
    async fn test_store_failure_during_search_is_an_error() {
        let h = harness();
        h.indexer
            .index_profile(&json!({"id": "a", "expertise": "vision"}))
            .await
            .unwrap();
        let side = rusqlite::Connection::open(h.dir.path().join("supermatch.db")).unwrap();
        side.execute_batch("DROP TABLE supervisor_embeddings;").unwrap();

        let result = h.searcher.search(&query(None, Some("vision"), None)).await;
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_invalid_request());
    }

    #[tokio::test]
    async fn test_failed_reindex_drops_old_field_match() {
        let h = harness();
        h.indexer
            .index_profile(&json!({"id": "a", "expertise": "Quantum Chemistry"}))
            .await
            .unwrap();
        let before = h
            .searcher
            .search(&query(None, Some("Quantum Chemistry"), None))
            .await
            .unwrap();
        assert_eq!(before.count, 1);

        h.provider.set_failing(true);
        h.indexer
            .index_profile(&json!({"id": "a", "expertise": "Medieval Poetry"}))
            .await
            .unwrap();
        h.provider.set_failing(false);

        // The query text is still cached from the first search.
        let after = h
            .searcher
            .search(&query(None, Some("Quantum Chemistry"), None))
            .await
            .unwrap();
        assert_eq!(after.count, 0);
    }
}
