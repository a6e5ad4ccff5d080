//! Portfolio administration: projects and their image galleries.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::content::ContentService;
use crate::application::images::{
    ImageFolder, ImageStore, ImageUpload, discard_images, validate_uploads,
};
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::ProjectRecord;
use crate::domain::inputs::{ImageOrder, ProjectInput};
use crate::domain::validation::ValidationErrors;

use super::AdminError;

const SOURCE: &str = "nextconfig::application::admin::portfolio";

/// A create or update request for a project.
#[derive(Debug, Clone)]
pub struct ProjectCommand {
    pub input: ProjectInput,
    /// New images, appended after the existing ones.
    pub images: Vec<ImageUpload>,
    /// Ids of existing images to remove. Ignored on create.
    pub delete_images: Vec<i64>,
}

#[derive(Clone)]
pub struct AdminPortfolioService {
    content: ContentService,
    writer: ContentWriter,
    images: Arc<dyn ImageStore>,
    max_image_bytes: u64,
}

impl AdminPortfolioService {
    pub fn new(
        content: ContentService,
        writer: ContentWriter,
        images: Arc<dyn ImageStore>,
        max_image_bytes: u64,
    ) -> Self {
        Self {
            content,
            writer,
            images,
            max_image_bytes,
        }
    }

    pub async fn list(&self) -> Result<Vec<ProjectRecord>, AdminError> {
        Ok(self.content.all_projects().await?)
    }

    pub async fn create(
        &self,
        command: ProjectCommand,
    ) -> Result<Committed<ProjectRecord>, AdminError> {
        self.validate(&command)?;

        let created = self.writer.create_project(command.input).await?;
        let project_id = created.value.id;
        info!(target = SOURCE, project_id, "project created");

        if command.images.is_empty() {
            return Ok(created);
        }
        let report = created.invalidation;
        let with_images = self.append_images(project_id, &command.images).await?;
        Ok(with_images.absorb(report))
    }

    pub async fn update(
        &self,
        id: i64,
        command: ProjectCommand,
    ) -> Result<Committed<ProjectRecord>, AdminError> {
        self.validate(&command)?;

        let mut committed = self
            .writer
            .update_project(id, command.input)
            .await
            .map_err(AdminError::repo("project"))?;

        if !command.delete_images.is_empty() {
            let removed = self
                .writer
                .remove_project_images(id, &command.delete_images)
                .await
                .map_err(AdminError::repo("project"))?;
            let report = committed.invalidation;
            let (project, images) = removed.value;
            let paths: Vec<&str> = images
                .iter()
                .map(|image| image.image_path.as_str())
                .collect();
            discard_images(self.images.as_ref(), paths).await;
            committed = Committed {
                value: project,
                invalidation: removed.invalidation,
            }
            .absorb(report);
        }

        if !command.images.is_empty() {
            let report = committed.invalidation;
            committed = self
                .append_images(id, &command.images)
                .await?
                .absorb(report);
        }

        info!(target = SOURCE, project_id = id, "project updated");
        Ok(committed)
    }

    /// Delete a project; its image rows cascade and the files are discarded.
    pub async fn delete(&self, id: i64) -> Result<Committed<ProjectRecord>, AdminError> {
        let committed = self
            .writer
            .delete_project(id)
            .await
            .map_err(AdminError::repo("project"))?;

        let project = &committed.value;
        let mut paths: Vec<&str> = project
            .images
            .iter()
            .map(|image| image.image_path.as_str())
            .collect();
        if let Some(main) = project.image_path.as_deref() {
            if !paths.contains(&main) {
                paths.push(main);
            }
        }
        discard_images(self.images.as_ref(), paths).await;

        info!(target = SOURCE, project_id = id, "project deleted");
        Ok(committed)
    }

    pub async fn reorder_images(
        &self,
        id: i64,
        orders: &[ImageOrder],
    ) -> Result<Committed<ProjectRecord>, AdminError> {
        self.writer
            .reorder_project_images(id, orders)
            .await
            .map_err(AdminError::repo("project"))
    }

    fn validate(&self, command: &ProjectCommand) -> Result<(), AdminError> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = command.input.validate() {
            errors.merge(err);
        }
        if let Err(err) = validate_uploads(&command.images, self.max_image_bytes) {
            errors.merge(err);
        }
        Ok(errors.into_result()?)
    }

    /// Store the files, then link them. Stored files are discarded when linking fails.
    async fn append_images(
        &self,
        project_id: i64,
        uploads: &[ImageUpload],
    ) -> Result<Committed<ProjectRecord>, AdminError> {
        let kinds = validate_uploads(uploads, self.max_image_bytes)?;
        let mut paths = Vec::with_capacity(uploads.len());
        for (upload, kind) in uploads.iter().zip(kinds) {
            match self
                .images
                .store(ImageFolder::Projects, kind, upload.data.clone())
                .await
            {
                Ok(stored) => paths.push(stored.path),
                Err(err) => {
                    discard_stored(self.images.as_ref(), &paths).await;
                    return Err(err.into());
                }
            }
        }

        match self.writer.add_project_images(project_id, &paths).await {
            Ok(committed) => Ok(committed),
            Err(err) => {
                warn!(
                    target = SOURCE,
                    project_id,
                    error = %err,
                    "failed to link stored images"
                );
                discard_stored(self.images.as_ref(), &paths).await;
                Err(AdminError::repo("project")(err))
            }
        }
    }
}

async fn discard_stored(images: &dyn ImageStore, paths: &[String]) {
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    discard_images(images, paths).await;
}
