//! Mapping template service, including the JSON exchange format

use crate::{
    error::{AppError, AppResult},
    models::mapping_template::{
        CreateMappingLine, CreateMappingTemplate, MappingTemplate, MappingTemplateFull,
        TemplateExport, TemplateExportLine,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct TemplatesService {
    repository: Repository,
}

impl TemplatesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, provider_id: Option<i32>) -> AppResult<Vec<MappingTemplate>> {
        self.repository.templates.list(provider_id).await
    }

    pub async fn get_full(&self, id: i32) -> AppResult<MappingTemplateFull> {
        let template = self.repository.templates.get_by_id(id).await?;
        let lines = self.repository.templates.lines(id).await?;
        Ok(MappingTemplateFull { template, lines })
    }

    pub async fn create(&self, data: &CreateMappingTemplate) -> AppResult<MappingTemplateFull> {
        if data.name.trim().is_empty() {
            return Err(AppError::Validation("Template name is required".to_string()));
        }
        let template = self.repository.templates.create(data).await?;
        self.get_full(template.id).await
    }

    pub async fn replace_lines(&self, id: i32, lines: &[CreateMappingLine]) -> AppResult<MappingTemplateFull> {
        self.repository.templates.replace_lines(id, lines).await?;
        self.get_full(id).await
    }

    pub async fn update_header(
        &self,
        id: i32,
        name: Option<&str>,
        notes: Option<&str>,
        active: Option<bool>,
    ) -> AppResult<MappingTemplate> {
        self.repository.templates.update_header(id, name, notes, active).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.templates.delete(id).await
    }

    /// Export templates (all of them, or a selection) in the shareable
    /// JSON format
    pub async fn export_json(&self, ids: Option<&[i32]>) -> AppResult<Vec<TemplateExport>> {
        let templates = match ids {
            Some(ids) => {
                let mut out = Vec::with_capacity(ids.len());
                for id in ids {
                    out.push(self.repository.templates.get_by_id(*id).await?);
                }
                out
            }
            None => self.repository.templates.list(None).await?,
        };

        let mut exports = Vec::with_capacity(templates.len());
        for template in templates {
            let lines = self.repository.templates.lines(template.id).await?;
            let provider_name = match template.provider_id {
                Some(pid) => Some(self.repository.providers.get_by_id(pid).await?.name),
                None => None,
            };
            exports.push(TemplateExport {
                name: template.name,
                provider_name,
                notes: template.notes.unwrap_or_default(),
                lines: lines.iter().map(TemplateExportLine::from).collect(),
            });
        }
        Ok(exports)
    }

    /// Import templates from the JSON format. An explicit `provider_id`
    /// wins; otherwise the exported provider name is looked up.
    pub async fn import_json(
        &self,
        exports: &[TemplateExport],
        provider_id: Option<i32>,
    ) -> AppResult<Vec<i32>> {
        if exports.is_empty() {
            return Err(AppError::BadRequest("No templates in payload".to_string()));
        }

        let mut created = Vec::with_capacity(exports.len());
        for export in exports {
            let resolved_provider = match provider_id {
                Some(pid) => Some(pid),
                None => match &export.provider_name {
                    Some(name) => self.repository.templates.find_provider_by_name(name).await?,
                    None => None,
                },
            };

            let data = CreateMappingTemplate {
                name: export.name.clone(),
                provider_id: resolved_provider,
                notes: if export.notes.is_empty() {
                    None
                } else {
                    Some(export.notes.clone())
                },
                lines: export
                    .lines
                    .iter()
                    .map(|line| CreateMappingLine {
                        sequence: line.sequence,
                        source_column: line.source_column.clone(),
                        target_field: line.target_field.clone(),
                        transform_type: line.transform_type.clone(),
                        transform_value: non_empty(&line.transform_value),
                        transform_value2: non_empty(&line.transform_value2),
                        concat_column: non_empty(&line.concat_column),
                        concat_separator: line.concat_separator.clone(),
                        skip_if_empty: line.skip_if_empty,
                        required_field: line.required_field,
                        update_mode: line.update_mode.clone(),
                        active: line.active,
                        notes: non_empty(&line.notes),
                    })
                    .collect(),
            };

            let template = self.repository.templates.create(&data).await?;
            tracing::info!(
                "imported mapping template '{}' (id={}) with {} line(s)",
                template.name,
                template.id,
                export.lines.len()
            );
            created.push(template.id);
        }
        Ok(created)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
