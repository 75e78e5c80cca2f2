//! Indexer: persists evaluation records and rebuilds the searchable index.
//!
//! Layout under the index root:
//!   <company-slug>/<company-slug>-<role-slug>-<YYYYMMDDTHHMMSS>-<attempt8>.evaluation.json
//!   .rag-index.json
//!
//! The index is a disposable cache: `rebuild` always re-reads every record and
//! rewrites the file wholesale. Records that fail to read or parse are skipped.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::evaluation::Evaluation;
use crate::models::index::{EvaluationIndex, IndexedEvaluation};
use crate::rag::classify::{infer_industry, infer_role_level};
use crate::storage::{Storage, StorageError, EVALUATION_SUFFIX};

pub const INDEX_FILE_NAME: &str = ".rag-index.json";
const ATTEMPT_TAG_LEN: usize = 8;

const COMPANY_SUFFIXES: &[&str] = &[
    ", LLC",
    ", Inc.",
    ", Inc",
    " LLC",
    " Inc.",
    " Inc",
    " Corporation",
    " Corp.",
    " Corp",
    " Limited",
    " Ltd.",
    " Ltd",
    " Co.",
    " Co",
];

#[derive(Clone)]
pub struct Indexer {
    storage: Arc<dyn Storage>,
    root: PathBuf,
}

impl Indexer {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// Where `evaluation` is stored. The attempt id prefix keeps two attempts
    /// evaluated in the same second apart.
    pub fn record_path(&self, evaluation: &Evaluation) -> PathBuf {
        let company = slugify(&evaluation.company);
        let role = slugify(&evaluation.role);
        let stamp = evaluation.evaluated_at.format("%Y%m%dT%H%M%S");
        let attempt = evaluation.attempt_id.simple().to_string();
        let attempt = &attempt[..ATTEMPT_TAG_LEN];
        self.root
            .join(&company)
            .join(format!("{company}-{role}-{stamp}-{attempt}{EVALUATION_SUFFIX}"))
    }

    /// Writes one evaluation record as pretty JSON and returns its path.
    pub async fn persist(&self, evaluation: &Evaluation) -> Result<PathBuf, StorageError> {
        let path = self.record_path(evaluation);
        let body = serde_json::to_string_pretty(evaluation)?;
        self.storage.write(&path, &body).await?;
        info!("Persisted evaluation for {} to {}", evaluation.target(), path.display());
        Ok(path)
    }

    /// Re-reads every record under the root and rewrites the index file.
    /// Returns the number of records indexed.
    pub async fn rebuild(&self) -> Result<(usize, EvaluationIndex), StorageError> {
        let paths = self.storage.list_records(&self.root).await?;

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let text = match self.storage.read(&path).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    warn!("Evaluation record {} vanished during rebuild", path.display());
                    continue;
                }
                Err(e) => {
                    warn!("Skipping unreadable evaluation {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_str::<Evaluation>(&text) {
                Ok(evaluation) => entries.push(project(&evaluation, path)),
                Err(e) => warn!("Skipping unparseable evaluation {}: {}", path.display(), e),
            }
        }

        let index = EvaluationIndex::new(entries);
        let body = serde_json::to_string_pretty(&index)?;
        self.storage.write(&self.index_path(), &body).await?;

        info!(
            "Rebuilt evaluation index at {} with {} entries",
            self.index_path().display(),
            index.len()
        );
        Ok((index.len(), index))
    }

    /// Reads the index file. A missing file is an empty index, not an error.
    pub async fn load(&self) -> Result<EvaluationIndex, StorageError> {
        let path = self.index_path();
        match self.storage.read(&path).await? {
            None => Ok(EvaluationIndex::empty()),
            Some(text) => serde_json::from_str(&text)
                .map_err(|source| StorageError::CorruptIndex { path, source }),
        }
    }
}

/// Search projection of one stored evaluation.
pub fn project(evaluation: &Evaluation, path: PathBuf) -> IndexedEvaluation {
    IndexedEvaluation {
        company: evaluation.company.clone(),
        role: evaluation.role.clone(),
        role_level: infer_role_level(&evaluation.role),
        industry: infer_industry(&evaluation.company),
        evaluated_at: evaluation.evaluated_at,
        overall_score: evaluation.scores.overall,
        critical_violations: evaluation.scores.critical_violation_count(),
        lessons_learned: evaluation.lessons.clone(),
        rag_context: evaluation.rag_context.clone(),
        path,
    }
}

/// File-name-safe slug: company suffixes stripped, lowercase ASCII
/// alphanumerics, single hyphens, none leading or trailing.
pub fn slugify(name: &str) -> String {
    let mut base = name.trim();
    for suffix in COMPANY_SUFFIXES {
        if base.len() > suffix.len()
            && base
                .get(base.len() - suffix.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
        {
            base = &base[..base.len() - suffix.len()];
            break;
        }
    }

    let mut slug = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}
