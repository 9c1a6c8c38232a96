use opsim_game::{AttemptStorage, StoredAttempt};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to access history file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("history file {path} is not valid JSON")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Attempt history kept as a pretty-printed JSON array, newest first.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_all(&self, attempts: &[StoredAttempt]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let payload = serde_json::to_vec_pretty(attempts).map_err(|source| HistoryError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, payload).map_err(|e| self.io_error(e))
    }
}

impl AttemptStorage for JsonFileStorage {
    type Error = HistoryError;

    fn load_attempts(&self) -> Result<Vec<StoredAttempt>, Self::Error> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw).map_err(|source| HistoryError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save_attempt(&self, attempt: &StoredAttempt) -> Result<(), Self::Error> {
        let mut attempts = self.load_attempts()?;
        attempts.insert(0, attempt.clone());
        self.write_all(&attempts)
    }

    fn clear_attempts(&self) -> Result<(), Self::Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

/// Storage used when no `--history` file is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl AttemptStorage for NoHistory {
    type Error = std::convert::Infallible;

    fn load_attempts(&self) -> Result<Vec<StoredAttempt>, Self::Error> {
        Ok(Vec::new())
    }

    fn save_attempt(&self, _attempt: &StoredAttempt) -> Result<(), Self::Error> {
        Ok(())
    }

    fn clear_attempts(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsim_game::{
        AssessmentStatus, OperatorClassification, PersonalityTraits, SimulatorConfig,
    };

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "opsim-history-{label}-{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn attempt(id: &str, final_score: i32) -> StoredAttempt {
        StoredAttempt {
            id: id.to_string(),
            date: "2026-01-02T03:04:05.000Z".to_string(),
            final_score,
            accuracy: 80,
            average_reaction: 900,
            personality: PersonalityTraits {
                vigilance: 64,
                compliance: 80,
                impulsivity: 10,
                stress_tolerance: 75,
                consistency: 70,
            },
            classification: OperatorClassification::Competent,
            status: AssessmentStatus::Pass,
        }
    }

    #[test]
    fn missing_file_is_empty_history() {
        let storage = JsonFileStorage::new(temp_path("missing"));
        assert!(storage.load_attempts().unwrap().is_empty());
        storage.clear_attempts().unwrap();
    }

    #[test]
    fn saves_newest_first_and_clears() {
        let path = temp_path("roundtrip");
        let storage = JsonFileStorage::new(&path);
        storage.save_attempt(&attempt("attempt-1", 310)).unwrap();
        storage.save_attempt(&attempt("attempt-2", 420)).unwrap();

        let loaded = storage.load_attempts().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "attempt-2");

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"finalScore\": 420"));

        storage.clear_attempts().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_reports_json_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        let storage = JsonFileStorage::new(&path);
        assert!(matches!(
            storage.load_attempts(),
            Err(HistoryError::Json { .. })
        ));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn engine_records_through_file_storage() {
        let path = temp_path("engine");
        let engine =
            opsim_game::AssessmentEngine::new(SimulatorConfig::default(), JsonFileStorage::new(&path))
                .unwrap();
        assert!(engine.history().unwrap().is_empty());
        engine.storage().save_attempt(&attempt("attempt-3", 5)).unwrap();
        assert_eq!(engine.history().unwrap()[0].id, "attempt-3");
        engine.clear_history().unwrap();
    }
}
