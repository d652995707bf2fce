use crate::{
    ai::{self, CompletionClient},
    app::service::AppService,
    config::Config,
    library::LibraryCsv,
    pipeline::Pipeline,
    storage,
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::sync::Arc;

/// Environment variable overriding the base directory
pub const BASE_PATH_ENV: &str = "CLOUDDRIVE_BASE_PATH";

/// Application factory for creating and configuring application components
pub struct AppFactory;

impl AppFactory {
    /// Create the application service.
    ///
    /// With `with_ai` the model client is connected here, so a missing
    /// credential fails the command before any work is done.
    pub fn create_app_service(
        paths: &AppPaths,
        config: &Config,
        with_ai: bool,
    ) -> Result<AppService> {
        let library = LibraryCsv::load(&paths.library_path)
            .with_context(|| format!("failed to load library {}", paths.library_path))?;
        let storage_mgr = storage::BackendLocal::new(&paths.uploads_path)
            .context("failed to create uploads directory")?;

        let pipeline = if with_ai {
            let client: Arc<dyn CompletionClient> = Arc::new(ai::connect(&config.ai)?);
            Some(Pipeline::new(client, &config.tagging))
        } else {
            None
        };

        Ok(AppService::new(
            Arc::new(library),
            Arc::new(storage_mgr),
            pipeline,
        ))
    }

    /// Get application paths, creating the base directory
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;
        let paths = AppPaths::new(&base_path);

        std::fs::create_dir_all(&paths.base_path)
            .context("Failed to create application base directory")?;

        Ok(paths)
    }

    pub fn create_config(base_path: &str) -> Result<Config> {
        Config::load_with(base_path).context("failed to load config")
    }

    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var(BASE_PATH_ENV) {
            return Ok(base_path);
        }

        let home = my_home()
            .ok()
            .flatten()
            .context("Could not determine home directory")?;
        Ok(format!("{}/.local/share/clouddrive", home.to_string_lossy()))
    }
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
    pub library_path: String,
    pub uploads_path: String,
}

impl AppPaths {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            library_path: format!("{base_path}/library.csv"),
            uploads_path: format!("{base_path}/uploads"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_paths() {
        let paths = AppPaths::new("/test/base");

        assert_eq!(paths.base_path, "/test/base");
        assert_eq!(paths.library_path, "/test/base/library.csv");
        assert_eq!(paths.uploads_path, "/test/base/uploads");
    }

    #[test]
    fn test_service_without_ai() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(tmp.path().to_str().unwrap());
        let config = Config::default();

        let app = AppFactory::create_app_service(&paths, &config, false).unwrap();
        assert!(!app.ai_available());
        assert!(tmp.path().join("library.csv").exists());
    }

    #[test]
    fn test_missing_credential_fails_at_startup() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(tmp.path().to_str().unwrap());
        let mut config = Config::default();
        config.ai.api_key = Some("  ".to_string());

        if std::env::var(crate::config::API_KEY_ENV).is_err() {
            let err = AppFactory::create_app_service(&paths, &config, true)
                .err()
                .expect("should fail without credential");
            assert!(err.to_string().contains("API key"));
        }
    }
}
