//! Group resolution for incoming candidates
//!
//! Assigns a candidate to a canonical group by, in order:
//! 1. Exact catalog-id match (confidence 1.0)
//! 2. Fuzzy normalized-title match within the release-year tolerance,
//!    highest similarity at or above the threshold wins
//! 3. A new group created from the candidate's identity
//!
//! Matched groups are never mutated: a catalog id arriving on a candidate
//! does not backfill a fuzzy-matched group, and two existing groups are
//! never merged.

use crate::services::title_matcher::{normalize_title, title_similarity};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use tubewatch_common::Result;

/// How a candidate was matched to its group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    CatalogId,
    Fuzzy,
    NewGroup,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::CatalogId => "catalog_id",
            MatchType::Fuzzy => "fuzzy",
            MatchType::NewGroup => "new_group",
        }
    }
}

/// Resolution result
#[derive(Debug, Clone)]
pub struct GroupMatch {
    pub group_guid: String,
    pub match_type: MatchType,
    pub confidence: f64,
}

/// Identity signals used for group resolution
#[derive(Debug, Clone)]
pub struct CandidateIdentity {
    pub title: String,
    pub catalog_id: Option<String>,
    pub release_year: Option<i64>,
}

pub struct GroupResolver {
    db: SqlitePool,
    similarity_threshold: f64,
    year_tolerance: i64,
}

impl GroupResolver {
    pub fn new(db: SqlitePool, similarity_threshold: f64, year_tolerance: i64) -> Self {
        Self {
            db,
            similarity_threshold,
            year_tolerance,
        }
    }

    /// Resolve a candidate's identity to a group, creating one if nothing
    /// matches. First hit wins: catalog id, then fuzzy, then new group.
    pub async fn resolve(&self, identity: &CandidateIdentity) -> Result<GroupMatch> {
        if let Some(catalog_id) = &identity.catalog_id {
            if let Some(group_guid) = self.find_by_catalog_id(catalog_id).await? {
                tracing::debug!(
                    catalog_id = %catalog_id,
                    group_guid = %group_guid,
                    "Matched group by catalog id"
                );
                return Ok(GroupMatch {
                    group_guid,
                    match_type: MatchType::CatalogId,
                    confidence: 1.0,
                });
            }
        }

        if let Some((group_guid, similarity)) = self.find_by_similarity(identity).await? {
            tracing::debug!(
                group_guid = %group_guid,
                similarity = similarity,
                title = %identity.title,
                "Matched group by title similarity"
            );
            return Ok(GroupMatch {
                group_guid,
                match_type: MatchType::Fuzzy,
                confidence: similarity,
            });
        }

        let group_guid = self.create_group(identity).await?;
        tracing::info!(
            group_guid = %group_guid,
            title = %identity.title,
            "Created new group"
        );
        Ok(GroupMatch {
            group_guid,
            match_type: MatchType::NewGroup,
            confidence: 1.0,
        })
    }

    async fn find_by_catalog_id(&self, catalog_id: &str) -> Result<Option<String>> {
        let guid: Option<String> =
            sqlx::query_scalar("SELECT guid FROM video_groups WHERE catalog_id = ?")
                .bind(catalog_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(guid)
    }

    /// Highest-similarity group at or above the threshold, gated by the
    /// release-year tolerance (years only compared when both sides have one).
    async fn find_by_similarity(&self, identity: &CandidateIdentity) -> Result<Option<(String, f64)>> {
        let groups: Vec<(String, String, Option<i64>)> =
            sqlx::query_as("SELECT guid, normalized_title, release_year FROM video_groups")
                .fetch_all(&self.db)
                .await?;

        let mut best: Option<(String, f64)> = None;

        for (guid, normalized_title, release_year) in groups {
            let year_compatible = match (identity.release_year, release_year) {
                (Some(a), Some(b)) => (a - b).abs() <= self.year_tolerance,
                _ => true,
            };
            if !year_compatible {
                continue;
            }

            let similarity = title_similarity(&identity.title, &normalized_title);
            if similarity < self.similarity_threshold {
                continue;
            }

            match &best {
                Some((_, best_similarity)) if similarity <= *best_similarity => {}
                _ => best = Some((guid, similarity)),
            }
        }

        Ok(best)
    }

    async fn create_group(&self, identity: &CandidateIdentity) -> Result<String> {
        let guid = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO video_groups \
             (guid, canonical_title, normalized_title, catalog_id, release_year, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&guid)
        .bind(&identity.title)
        .bind(normalize_title(&identity.title))
        .bind(&identity.catalog_id)
        .bind(identity.release_year)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;
        Ok(guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubewatch_common::db::create_tables;

    async fn setup_resolver() -> GroupResolver {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_tables(&pool).await.unwrap();
        GroupResolver::new(pool, 0.7, 1)
    }

    fn identity(title: &str, catalog_id: Option<&str>, year: Option<i64>) -> CandidateIdentity {
        CandidateIdentity {
            title: title.to_string(),
            catalog_id: catalog_id.map(str::to_string),
            release_year: year,
        }
    }

    #[tokio::test]
    async fn test_first_candidate_creates_group() {
        let resolver = setup_resolver().await;
        let result = resolver
            .resolve(&identity("Bohemian Rhapsody", Some("cat-123"), Some(1975)))
            .await
            .unwrap();
        assert_eq!(result.match_type, MatchType::NewGroup);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_catalog_id_match_beats_fuzzy() {
        let resolver = setup_resolver().await;
        let first = resolver
            .resolve(&identity("Bohemian Rhapsody", Some("cat-123"), Some(1975)))
            .await
            .unwrap();

        // Dissimilar title, same catalog id: still the same group
        let second = resolver
            .resolve(&identity("Completely Different Name", Some("cat-123"), None))
            .await
            .unwrap();
        assert_eq!(second.match_type, MatchType::CatalogId);
        assert_eq!(second.confidence, 1.0);
        assert_eq!(second.group_guid, first.group_guid);
    }

    #[tokio::test]
    async fn test_fuzzy_match_above_threshold() {
        let resolver = setup_resolver().await;
        let first = resolver
            .resolve(&identity("Bohemian Rhapsody Official Video", None, Some(1975)))
            .await
            .unwrap();

        let second = resolver
            .resolve(&identity(
                "Bohemian Rhapsody (Official Video) [Remastered]",
                None,
                Some(1975),
            ))
            .await
            .unwrap();
        assert_eq!(second.match_type, MatchType::Fuzzy);
        assert_eq!(second.group_guid, first.group_guid);
        assert!(second.confidence >= 0.7);
        assert!(second.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_dissimilar_title_creates_new_group() {
        let resolver = setup_resolver().await;
        let first = resolver
            .resolve(&identity("Bohemian Rhapsody", None, None))
            .await
            .unwrap();
        let second = resolver
            .resolve(&identity("Smells Like Teen Spirit", None, None))
            .await
            .unwrap();
        assert_eq!(second.match_type, MatchType::NewGroup);
        assert_ne!(second.group_guid, first.group_guid);
    }

    #[tokio::test]
    async fn test_year_gate_blocks_fuzzy_match() {
        let resolver = setup_resolver().await;
        let first = resolver
            .resolve(&identity("Hurt Official Music Video", None, Some(1995)))
            .await
            .unwrap();

        // Same title, far-apart years: a cover, not a duplicate
        let second = resolver
            .resolve(&identity("Hurt Official Music Video", None, Some(2002)))
            .await
            .unwrap();
        assert_eq!(second.match_type, MatchType::NewGroup);
        assert_ne!(second.group_guid, first.group_guid);

        // Within tolerance matches
        let third = resolver
            .resolve(&identity("Hurt Official Music Video", None, Some(1996)))
            .await
            .unwrap();
        assert_eq!(third.group_guid, first.group_guid);
    }

    #[tokio::test]
    async fn test_missing_year_on_either_side_allows_match() {
        let resolver = setup_resolver().await;
        let first = resolver
            .resolve(&identity("Take On Me Official Video", None, Some(1985)))
            .await
            .unwrap();
        let second = resolver
            .resolve(&identity("Take On Me Official Video", None, None))
            .await
            .unwrap();
        assert_eq!(second.match_type, MatchType::Fuzzy);
        assert_eq!(second.group_guid, first.group_guid);
    }

    #[tokio::test]
    async fn test_match_does_not_mutate_group_identity() {
        let resolver = setup_resolver().await;
        let first = resolver
            .resolve(&identity("Africa Official Video", None, Some(1982)))
            .await
            .unwrap();

        // Fuzzy match carrying a catalog id must not backfill the group
        resolver
            .resolve(&identity("Africa Official Video HD", Some("cat-999"), Some(1982)))
            .await
            .unwrap();

        let stored_catalog: Option<String> =
            sqlx::query_scalar("SELECT catalog_id FROM video_groups WHERE guid = ?")
                .bind(&first.group_guid)
                .fetch_one(&resolver.db)
                .await
                .unwrap();
        assert_eq!(stored_catalog, None);
    }
}
