use std::io::ErrorKind;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::pipeline::parse_tag_list;

/// Tag metadata of one stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub owner_id: String,
    pub filename: String,
    pub tags: Vec<String>,
}

impl FileRecord {
    pub fn new(owner_id: &str, filename: &str, tags: Vec<String>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
            tags,
        }
    }
}

pub trait FileLibrary: Send + Sync {
    /// All records of one owner, in insertion order.
    fn records_for(&self, owner_id: &str) -> Vec<FileRecord>;
    #[cfg(test)]
    fn get(&self, owner_id: &str, filename: &str) -> Option<FileRecord>;
    /// Insert a record or replace the tags of an existing one.
    fn upsert(&self, record: FileRecord) -> anyhow::Result<FileRecord>;
    /// Returns false when there was nothing to delete.
    fn delete(&self, owner_id: &str, filename: &str) -> anyhow::Result<bool>;
}

const CSV_HEADERS: [&str; 3] = ["owner_id", "filename", "tags"];

pub struct LibraryCsv {
    list: Arc<RwLock<Vec<FileRecord>>>,
    path: String,
}

impl LibraryCsv {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new library at {path}");
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let now = Instant::now();
        let mut csv_reader = csv::Reader::from_path(path)?;

        let mut records = vec![];
        for row in csv_reader.records() {
            let row = row?;
            let owner_id = row
                .get(0)
                .ok_or(anyhow!("couldnt get record owner"))?
                .to_string();
            let filename = row
                .get(1)
                .ok_or(anyhow!("couldnt get record filename"))?
                .to_string();
            let tags = parse_tag_list(row.get(2).ok_or(anyhow!("couldnt get record tags"))?);

            records.push(FileRecord {
                owner_id,
                filename,
                tags,
            });
        }

        log::debug!("loaded {} records in {:?}", records.len(), now.elapsed());

        Ok(LibraryCsv {
            list: Arc::new(RwLock::new(records)),
            path: path.to_string(),
        })
    }

    fn save(&self, records: &[FileRecord]) -> anyhow::Result<()> {
        let temp_path = format!("{}-tmp", &self.path);

        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for record in records {
            csv_wrt.write_record([&record.owner_id, &record.filename, &record.tags.join(",")])?;
        }
        csv_wrt.flush()?;

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to replace {}", self.path))?;
        Ok(())
    }

    fn read_list(&self) -> std::sync::RwLockReadGuard<'_, Vec<FileRecord>> {
        self.list.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_list(&self) -> std::sync::RwLockWriteGuard<'_, Vec<FileRecord>> {
        self.list.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileLibrary for LibraryCsv {
    fn records_for(&self, owner_id: &str) -> Vec<FileRecord> {
        self.read_list()
            .iter()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    fn get(&self, owner_id: &str, filename: &str) -> Option<FileRecord> {
        self.read_list()
            .iter()
            .find(|record| record.owner_id == owner_id && record.filename == filename)
            .cloned()
    }

    fn upsert(&self, record: FileRecord) -> anyhow::Result<FileRecord> {
        let mut records = self.write_list();

        match records
            .iter_mut()
            .find(|r| r.owner_id == record.owner_id && r.filename == record.filename)
        {
            Some(existing) => existing.tags = record.tags.clone(),
            None => records.push(record.clone()),
        }

        self.save(&records)?;
        Ok(record)
    }

    fn delete(&self, owner_id: &str, filename: &str) -> anyhow::Result<bool> {
        let mut records = self.write_list();

        let Some(idx) = records
            .iter()
            .position(|r| r.owner_id == owner_id && r.filename == filename)
        else {
            return Ok(false);
        };

        records.remove(idx);
        self.save(&records)?;
        Ok(true)
    }
}
