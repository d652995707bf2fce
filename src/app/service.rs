use std::sync::Arc;

use serde::Serialize;

use crate::{
    library::{FileLibrary, FileRecord},
    pipeline::{retain_known, CategoryAssignment, ContentKind, Pipeline},
    storage::{self, StorageManager},
};

use super::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    /// `None` when tagging failed; the file is stored regardless.
    pub tags: Option<Vec<String>>,
    pub tagged: bool,
}

/// A stored file with its tags, if it has a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub tags: Option<Vec<String>>,
    pub size: u64,
}

pub struct AppService {
    library: Arc<dyn FileLibrary>,
    storage: Arc<dyn StorageManager>,
    pipeline: Option<Pipeline>,
}

impl AppService {
    pub fn new(
        library: Arc<dyn FileLibrary>,
        storage: Arc<dyn StorageManager>,
        pipeline: Option<Pipeline>,
    ) -> Self {
        Self {
            library,
            storage,
            pipeline,
        }
    }

    #[cfg(test)]
    pub fn ai_available(&self) -> bool {
        self.pipeline.is_some()
    }

    fn pipeline(&self) -> Result<&Pipeline, AppError> {
        self.pipeline.as_ref().ok_or(AppError::AiUnavailable)
    }

    /// Store `content` and tag it. The record is written only when tagging
    /// succeeds; a failed tagging leaves the file stored but untagged.
    pub fn upload(
        &self,
        owner_id: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<UploadOutcome, AppError> {
        validate(owner_id, filename)?;
        let pipeline = self.pipeline()?;

        self.storage
            .write(&storage::owner_ident(owner_id, filename), content)?;

        let kind = ContentKind::from_filename(filename);
        match pipeline.extractor.extract_tags(filename, content, kind) {
            Ok(tags) => {
                let record = self
                    .library
                    .upsert(FileRecord::new(owner_id, filename, tags))?;
                log::info!(
                    "op=upload owner={owner_id} file={filename} outcome=tagged tags={}",
                    record.tags.len()
                );
                Ok(UploadOutcome {
                    filename: filename.to_string(),
                    tags: Some(record.tags),
                    tagged: true,
                })
            }
            Err(err) => {
                // tags of a previous upload under this name no longer apply
                self.library.delete(owner_id, filename)?;
                log::warn!("op=upload owner={owner_id} file={filename} outcome=untagged err={err}");
                Ok(UploadOutcome {
                    filename: filename.to_string(),
                    tags: None,
                    tagged: false,
                })
            }
        }
    }

    /// Regenerate tags from the stored bytes. On failure the old tags stay.
    pub fn retag(&self, owner_id: &str, filename: &str) -> Result<FileRecord, AppError> {
        validate(owner_id, filename)?;
        let pipeline = self.pipeline()?;

        let ident = storage::owner_ident(owner_id, filename);
        if !self.storage.exists(&ident) {
            return Err(AppError::NotFound);
        }
        let content = self.storage.read(&ident)?;

        let kind = ContentKind::from_filename(filename);
        let tags = pipeline.extractor.extract_tags(filename, &content, kind)?;

        let record = self
            .library
            .upsert(FileRecord::new(owner_id, filename, tags))?;
        log::info!("op=retag owner={owner_id} file={filename} tags={}", record.tags.len());
        Ok(record)
    }

    pub fn list(&self, owner_id: &str) -> Result<Vec<FileEntry>, AppError> {
        validate_owner(owner_id)?;

        let records = self.library.records_for(owner_id);

        self.storage
            .list(owner_id)
            .into_iter()
            .map(|filename| -> Result<FileEntry, AppError> {
                let size = self
                    .storage
                    .size(&storage::owner_ident(owner_id, &filename))?;
                let tags = records
                    .iter()
                    .find(|record| record.filename == filename)
                    .map(|record| record.tags.clone());
                Ok(FileEntry {
                    filename,
                    tags,
                    size,
                })
            })
            .collect()
    }

    pub fn download(&self, owner_id: &str, filename: &str) -> Result<Vec<u8>, AppError> {
        validate(owner_id, filename)?;

        let ident = storage::owner_ident(owner_id, filename);
        if !self.storage.exists(&ident) {
            return Err(AppError::NotFound);
        }
        Ok(self.storage.read(&ident)?)
    }

    pub fn delete(&self, owner_id: &str, filename: &str) -> Result<(), AppError> {
        validate(owner_id, filename)?;

        let ident = storage::owner_ident(owner_id, filename);
        if !self.storage.exists(&ident) {
            return Err(AppError::NotFound);
        }

        self.storage.delete(&ident)?;
        self.library.delete(owner_id, filename)?;
        log::info!("op=delete owner={owner_id} file={filename}");
        Ok(())
    }

    pub fn categorize(&self, owner_id: &str) -> Result<CategoryAssignment, AppError> {
        validate_owner(owner_id)?;
        let pipeline = self.pipeline()?;

        let records = self.library.records_for(owner_id);
        Ok(pipeline.categorizer.categorize(&records))
    }

    /// Records matching `query`, most relevant first. Only the owner's own
    /// records can be returned, whatever the model replies.
    pub fn search(&self, owner_id: &str, query: &str) -> Result<Vec<FileRecord>, AppError> {
        validate_owner(owner_id)?;
        if query.trim().is_empty() {
            return Ok(vec![]);
        }
        let pipeline = self.pipeline()?;

        let records = self.library.records_for(owner_id);
        let matches = pipeline.matcher.find_matches(query, &records);

        Ok(retain_known(&matches, &records)
            .into_iter()
            .cloned()
            .collect())
    }
}

fn validate_owner(owner_id: &str) -> Result<(), AppError> {
    if !storage::is_safe_component(owner_id) {
        return Err(AppError::InvalidName(owner_id.to_string()));
    }
    Ok(())
}

fn validate(owner_id: &str, filename: &str) -> Result<(), AppError> {
    validate_owner(owner_id)?;
    if !storage::is_safe_component(filename) {
        return Err(AppError::InvalidName(filename.to_string()));
    }
    Ok(())
}
