use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataLoadError;
use crate::expression::Classification;
use crate::record::StudentRecord;

/// On-disk record of a student's courses:
///
/// ```json
/// { "taken": ["ACCT209 C"], "enrolled": ["ECEN449 C ^"], "classification": "junior" }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CourseHistory {
    pub taken: Vec<String>,
    pub enrolled: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl CourseHistory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DataLoadError::io(path, source))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the history as 4-space indented JSON, replacing `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataLoadError> {
        let path = path.as_ref();
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        fs::write(path, out).map_err(|source| DataLoadError::io(path, source))?;
        tracing::debug!(path = %path.display(), taken = self.taken.len(), enrolled = self.enrolled.len(), "saved course history");
        Ok(())
    }

    /// Loads the history at `path`, appends `entries` to the taken list and
    /// saves it back.
    pub fn append_taken<I>(path: impl AsRef<Path>, entries: I) -> Result<Self, DataLoadError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self::update(path.as_ref(), |history| history.taken.extend(normalize(entries)))
    }

    /// Loads the history at `path`, appends `entries` to the enrolled list
    /// and saves it back.
    pub fn append_enrolled<I>(path: impl AsRef<Path>, entries: I) -> Result<Self, DataLoadError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self::update(path.as_ref(), |history| history.enrolled.extend(normalize(entries)))
    }

    fn update(path: &Path, change: impl FnOnce(&mut Self)) -> Result<Self, DataLoadError> {
        let mut history = Self::load(path)?;
        change(&mut history);
        history.save(path)?;
        Ok(history)
    }

    pub fn to_record(&self) -> StudentRecord {
        let record = StudentRecord::from_entries(&self.taken, &self.enrolled);
        match self.classification {
            Some(classification) => record.with_classification(classification),
            None => record,
        }
    }
}

fn normalize<I>(entries: I) -> impl Iterator<Item = String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| entry.as_ref().trim().to_ascii_uppercase())
}
