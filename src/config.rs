use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogFormat;
use crate::storage::{self, StorageManager};

const CONFIG_FILE: &str = "config.yaml";

/// Maximum number of recommendations kept per query
const DEFAULT_MAX_RESULTS: usize = 2000;
/// Recommendations per page
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_MODEL_NAME: &str = "i2v";

/// Where the catalog lives and how to read it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,

    /// Single-byte field delimiter, e.g. "\t" or ","
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_id_column")]
    pub id_column: String,

    #[serde(default = "default_title_column")]
    pub title_column: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            delimiter: default_delimiter(),
            id_column: default_id_column(),
            title_column: default_title_column(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("movies.tsv")
}

fn default_delimiter() -> String {
    "\t".to_string()
}

fn default_id_column() -> String {
    "movie_id".to_string()
}

fn default_title_column() -> String {
    "title".to_string()
}

/// Embedding vectors and query behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendConfig {
    #[serde(default = "default_vectors_path")]
    pub vectors_path: PathBuf,

    /// Name hashed into vectors.bin; loading refuses files of another model
    #[serde(default = "default_model_name")]
    pub model_name: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Unit-normalize each liked/disliked vector before summing
    #[serde(default = "default_true")]
    pub normalize_exemplars: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            vectors_path: default_vectors_path(),
            model_name: default_model_name(),
            max_results: DEFAULT_MAX_RESULTS,
            page_size: DEFAULT_PAGE_SIZE,
            normalize_exemplars: true,
        }
    }
}

fn default_vectors_path() -> PathBuf {
    PathBuf::from("vectors.bin")
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        let rec = &self.recommend;
        if rec.max_results == 0 {
            bail!("recommend.max_results must be greater than 0");
        }
        if rec.page_size == 0 {
            bail!("recommend.page_size must be greater than 0");
        }
        if rec.model_name.trim().is_empty() {
            bail!("recommend.model_name cannot be empty");
        }

        let cat = &self.catalog;
        if cat.id_column.trim().is_empty() || cat.title_column.trim().is_empty() {
            bail!("catalog.id_column and catalog.title_column cannot be empty");
        }
        if cat.id_column == cat.title_column {
            bail!("catalog.id_column and catalog.title_column must differ");
        }
        self.catalog_format()?;

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, writing defaults when missing.
    pub fn load_with(base_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let base_path = base_path.as_ref();
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("cannot create {}", base_path.display()))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("Creating default config at {}", base_path.join(CONFIG_FILE).display());
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a configured path against the base directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve_path(&self.catalog.path)
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.resolve_path(&self.recommend.vectors_path)
    }

    pub fn catalog_format(&self) -> anyhow::Result<CatalogFormat> {
        let delimiter = match self.catalog.delimiter.as_bytes() {
            [byte] => *byte,
            _ => bail!(
                "catalog.delimiter must be a single byte, got {:?}",
                self.catalog.delimiter
            ),
        };

        Ok(CatalogFormat {
            delimiter,
            id_column: self.catalog.id_column.clone(),
            title_column: self.catalog.title_column.clone(),
        })
    }
}
