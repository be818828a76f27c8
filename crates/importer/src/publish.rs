//! Leaderboard documents, one JSON file per population.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use storage::dto::ranking::RankingEntry;
use storage::models::Population;

use crate::Result;

pub struct LeaderboardPublisher {
    output_dir: PathBuf,
}

impl LeaderboardPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn document_path(&self, population: Population) -> PathBuf {
        self.output_dir
            .join(format!("{}_ranking.json", population.as_str()))
    }

    /// Replaces the population's document. Returns `false` without touching
    /// the file when its content would not change.
    pub async fn publish(&self, population: Population, entries: &[RankingEntry]) -> Result<bool> {
        let path = self.document_path(population);
        let content = serde_json::to_vec_pretty(entries)?;

        if read_existing(&path).await?.as_deref() == Some(content.as_slice()) {
            debug!("{} unchanged", path.display());
            return Ok(false);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!("Published {} entries to {}", entries.len(), path.display());
        Ok(true)
    }
}

async fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rank: i64, id: i64, rating: f64) -> RankingEntry {
        RankingEntry {
            rank,
            id,
            name: format!("PLAYER {}", id),
            name_zh: format!("PLAYER {}", id),
            yob: Some(2001),
            association: "JPN".to_string(),
            association_zh: String::new(),
            rating,
            error: 60.0,
            adjusted_rating: rating - 60.0,
        }
    }

    #[tokio::test]
    async fn test_publish_writes_and_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = LeaderboardPublisher::new(dir.path());
        let entries = vec![entry(1, 5, 250.0), entry(2, 9, 120.5)];

        assert!(publisher.publish(Population::Women, &entries).await.unwrap());
        let path = dir.path().join("women_ranking.json");
        let written: Vec<RankingEntry> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, entries);

        assert!(!publisher.publish(Population::Women, &entries).await.unwrap());
        assert!(!dir.path().join("women_ranking.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_changed_entries_replace_document() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = LeaderboardPublisher::new(dir.path());

        publisher
            .publish(Population::Men, &[entry(1, 1, 100.0)])
            .await
            .unwrap();
        assert!(publisher.publish(Population::Men, &[]).await.unwrap());

        let content = std::fs::read_to_string(dir.path().join("men_ranking.json")).unwrap();
        assert_eq!(content, "[]");
    }
}
