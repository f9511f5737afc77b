use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::bucket::Bucket;
use crate::error::DataLoadError;
use crate::expression::{CourseCode, RequirementTree};

/// JSON pointer to a course's stored prerequisite bucket.
pub const PREREQS_POINTER: &str = "/info/prereqs";

/// The course catalog data file: an object keyed by course identifier
/// (`"ECEN_403"`), each holding its prerequisite bucket at `info.prereqs`.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    courses: Map<String, Value>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DataLoadError::io(path, source))?;
        let catalog = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), courses = catalog.courses.len(), "loaded catalog");
        Ok(catalog)
    }

    pub fn from_json(text: &str) -> Result<Self, DataLoadError> {
        Ok(Self {
            courses: serde_json::from_str(text)?,
        })
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// The stored bucket list of `course`, which may be written `"CSCE_222"`,
    /// `"csce 222"` or `"CSCE222"`.
    pub fn bucket(&self, course: &str) -> Result<Vec<Bucket>, DataLoadError> {
        let key = course.parse::<CourseCode>()?.catalog_key();
        let entry = self
            .courses
            .get(&key)
            .ok_or_else(|| DataLoadError::CourseNotFound(key.clone()))?;
        let prereqs = entry
            .pointer(PREREQS_POINTER)
            .ok_or(DataLoadError::MissingPrerequisites(key))?;
        let bucket: Bucket = serde_json::from_value(prereqs.clone())?;
        Ok(bucket.into_items())
    }

    /// The decoded requirement tree of `course`.
    pub fn requirements(&self, course: &str) -> Result<RequirementTree, DataLoadError> {
        let code: CourseCode = course.parse()?;
        let items = self.bucket(course)?;
        RequirementTree::from_bucket(Some(code.clone()), &items).map_err(|source| DataLoadError::Bucket {
            course: code.catalog_key(),
            source,
        })
    }
}
