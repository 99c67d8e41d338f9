use crate::models::screenshot_types::ScreenshotRecord;
use std::collections::BTreeSet;

/// Confirmed game screenshots, newest first, at most one per file name.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotIndex {
    records: Vec<ScreenshotRecord>,
}

impl ScreenshotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from arbitrary records, keeping the newest per file name.
    pub fn from_records(records: impl IntoIterator<Item = ScreenshotRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert_or_replace(record);
        }
        index
    }

    pub fn insert_or_replace(&mut self, record: ScreenshotRecord) {
        self.remove_by_filename(&record.file_name);
        let pos = self
            .records
            .partition_point(|r| r.date_added >= record.date_added);
        self.records.insert(pos, record);
    }

    /// Returns the id of the removed record.
    pub fn remove_by_filename(&mut self, file_name: &str) -> Option<String> {
        let pos = self.records.iter().position(|r| r.file_name == file_name)?;
        Some(self.records.remove(pos).id)
    }

    pub fn retain(&mut self, keep: impl FnMut(&ScreenshotRecord) -> bool) {
        self.records.retain(keep);
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.records.iter().any(|r| r.file_name == file_name)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// `None` or `"all"` lists everything.
    pub fn list(&self, category: Option<&str>) -> Vec<ScreenshotRecord> {
        match category {
            None | Some("all") => self.records.clone(),
            Some(cat) => self
                .records
                .iter()
                .filter(|r| r.category() == cat)
                .cloned()
                .collect(),
        }
    }

    pub fn records(&self) -> &[ScreenshotRecord] {
        &self.records
    }

    pub fn categories(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.category().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
