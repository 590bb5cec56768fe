use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use crate::models::{EvidenceHit, SourceFilter};

use super::memory::InMemoryEvidenceStore;
use super::store::EvidenceStore;
use super::EvidenceError;

static GLOBAL_INDEX: OnceLock<EvidenceIndex> = OnceLock::new();

/// Read-only evidence snapshot loaded lazily from a JSON corpus.
///
/// The snapshot is loaded on the first search (or after `invalidate`) and then
/// shared. A failed load leaves the slot empty so the next call retries.
pub struct EvidenceIndex {
    path: PathBuf,
    snapshot: RwLock<Option<Arc<InMemoryEvidenceStore>>>,
}

impl EvidenceIndex {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            snapshot: RwLock::new(None),
        }
    }

    /// Process-wide index. The corpus path of the first caller wins; a later
    /// caller asking for another path is warned and gets the existing index.
    pub fn global(path: &Path) -> &'static EvidenceIndex {
        shared_index(&GLOBAL_INDEX, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Current snapshot, loading it on a miss.
    pub fn handle(&self) -> Result<Arc<InMemoryEvidenceStore>, EvidenceError> {
        {
            let slot = self.snapshot.read().map_err(|_| EvidenceError::LockPoisoned)?;
            if let Some(store) = slot.as_ref() {
                return Ok(Arc::clone(store));
            }
        }
        self.reload()
    }

    /// Load the corpus again and swap it in.
    pub fn reload(&self) -> Result<Arc<InMemoryEvidenceStore>, EvidenceError> {
        let store = Arc::new(InMemoryEvidenceStore::load(&self.path)?);
        let mut slot = self.snapshot.write().map_err(|_| EvidenceError::LockPoisoned)?;
        *slot = Some(Arc::clone(&store));
        tracing::info!(path = %self.path.display(), chunks = store.len(), "Evidence index ready");
        Ok(store)
    }

    /// Drop the snapshot; the next search reloads it.
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.snapshot.write() {
            *slot = None;
        }
    }
}

impl EvidenceStore for EvidenceIndex {
    fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SourceFilter>,
    ) -> Result<Vec<EvidenceHit>, EvidenceError> {
        self.handle()?.search(query, top_k, filter)
    }
}

fn shared_index<'a>(slot: &'a OnceLock<EvidenceIndex>, path: &Path) -> &'a EvidenceIndex {
    let index = slot.get_or_init(|| EvidenceIndex::new(path));
    if index.path() != path {
        tracing::warn!(
            requested = %path.display(),
            active = %index.path().display(),
            "Evidence index already initialised with another corpus; requested path ignored"
        );
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn corpus_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"source": "data/prednisona.pdf", "page": 1, "text": "{text}"}}]"#
        )
        .unwrap();
        file
    }

    #[test]
    fn loads_on_first_search() {
        let file = corpus_file("Prednisone maximum daily dose 60 mg");
        let index = EvidenceIndex::new(file.path());
        assert!(!index.is_loaded());

        let hits = index.search("prednisone", 5, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(index.is_loaded());
    }

    #[test]
    fn handle_is_shared_between_calls() {
        let file = corpus_file("Prednisone");
        let index = EvidenceIndex::new(file.path());
        let a = index.handle().unwrap();
        let b = index.handle().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalidate_forces_reload() {
        let file = corpus_file("Prednisone old text");
        let index = EvidenceIndex::new(file.path());
        let first = index.handle().unwrap();

        std::fs::write(
            file.path(),
            r#"[{"source": "x.pdf", "text": "Prednisone new text"}, {"source": "y.pdf", "text": "Prednisone"}]"#,
        )
        .unwrap();
        // Snapshot is unchanged until invalidated.
        assert_eq!(index.handle().unwrap().len(), 1);

        index.invalidate();
        let second = index.handle().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn shared_index_keeps_first_corpus_path() {
        let slot = OnceLock::new();
        let first = shared_index(&slot, Path::new("/data/first.json"));
        let second = shared_index(&slot, Path::new("/data/second.json"));
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.path(), Path::new("/data/first.json"));
    }

    #[test]
    fn global_returns_one_instance() {
        let a = EvidenceIndex::global(Path::new("/data/evidence.json"));
        let b = EvidenceIndex::global(Path::new("/elsewhere/evidence.json"));
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn missing_corpus_is_error_and_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.json");
        let index = EvidenceIndex::new(&path);

        assert!(matches!(
            index.search("ibuprofen", 5, None),
            Err(EvidenceError::CorpusLoad { .. })
        ));
        assert!(!index.is_loaded());

        std::fs::write(&path, r#"[{"source": "a.pdf", "text": "Ibuprofen 40 mg/kg/day"}]"#).unwrap();
        assert_eq!(index.search("ibuprofen", 5, None).unwrap().len(), 1);
    }
}
