//! Provider management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::provider::{CreateProvider, Provider, UpdateProvider},
    repository::Repository,
};

#[derive(Clone)]
pub struct ProvidersService {
    repository: Repository,
}

impl ProvidersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, only_active: bool) -> AppResult<Vec<Provider>> {
        self.repository.providers.list(only_active).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Provider> {
        self.repository.providers.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateProvider) -> AppResult<Provider> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if let Some(delim) = &data.csv_delimiter {
            validate_delimiter(delim)?;
        }
        self.repository.providers.create(data).await
    }

    pub async fn update(&self, id: i32, data: &UpdateProvider) -> AppResult<Provider> {
        if let Some(delim) = &data.csv_delimiter {
            validate_delimiter(delim)?;
        }
        if let Some(template_id) = data.mapping_template_id {
            // Fail early when pointing at a template that does not exist
            self.repository.templates.get_by_id(template_id).await?;
        }
        self.repository.providers.update(id, data).await
    }
}

/// Delimiters are 1 to 5 characters ('|', ';', "||", tab...)
fn validate_delimiter(delimiter: &str) -> AppResult<()> {
    let len = delimiter.chars().count();
    if len == 0 || len > 5 {
        return Err(AppError::Validation(
            "CSV delimiter must be 1 to 5 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_delimiter() {
        assert!(validate_delimiter(";").is_ok());
        assert!(validate_delimiter("||").is_ok());
        assert!(validate_delimiter("\t").is_ok());
        assert!(validate_delimiter("").is_err());
        assert!(validate_delimiter("toolong").is_err());
    }
}
