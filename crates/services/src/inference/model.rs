use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::error::ModelLoadError;

/// Where the bundled ASL detection model is published.
pub const DEFAULT_MODEL_URL: &str =
    "https://tfjslingomodel.s3.us-east.cloud-object-storage.appdomain.cloud/model.json";

const GRAPH_MODEL_FORMAT: &str = "graph-model";

//
// ─── MANIFEST ──────────────────────────────────────────────────────────────────
//

/// Parsed `model.json` of a serialized graph model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelManifest {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub model_topology: Option<serde_json::Value>,
    #[serde(default)]
    pub weights_manifest: Vec<WeightsGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsGroup {
    pub paths: Vec<String>,
    #[serde(default)]
    pub weights: Vec<WeightSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightSpec {
    pub name: String,
    #[serde(default)]
    pub shape: Vec<usize>,
    pub dtype: String,
}

/// A fetched and validated model description, ready to hand to a backend.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    url: Url,
    manifest: ModelManifest,
}

impl ModelArtifact {
    /// Parses and validates a manifest body.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError` for malformed JSON, a non graph-model format,
    /// a missing topology, or an empty weights manifest.
    pub fn from_manifest_json(url: Url, body: &[u8]) -> Result<Self, ModelLoadError> {
        let manifest: ModelManifest = serde_json::from_slice(body)?;

        if let Some(format) = manifest.format.as_deref() {
            if format != GRAPH_MODEL_FORMAT {
                return Err(ModelLoadError::UnsupportedFormat(format.to_owned()));
            }
        }
        if manifest.model_topology.is_none() {
            return Err(ModelLoadError::MissingTopology);
        }
        if manifest.weights_manifest.iter().all(|g| g.paths.is_empty()) {
            return Err(ModelLoadError::MissingWeights);
        }

        Ok(Self { url, manifest })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    /// Weight shard locations resolved against the manifest URL.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError::InvalidUrl` if a shard path cannot be joined.
    pub fn weight_urls(&self) -> Result<Vec<Url>, ModelLoadError> {
        self.manifest
            .weights_manifest
            .iter()
            .flat_map(|group| group.paths.iter())
            .map(|path| self.url.join(path).map_err(ModelLoadError::from))
            .collect()
    }

    #[must_use]
    pub fn weight_count(&self) -> usize {
        self.manifest
            .weights_manifest
            .iter()
            .map(|g| g.weights.len())
            .sum()
    }
}

//
// ─── SOURCES ───────────────────────────────────────────────────────────────────
//

/// Provides the model artifact at startup.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ModelLoadError` if the artifact is unreachable or malformed.
    async fn fetch(&self) -> Result<ModelArtifact, ModelLoadError>;
}

/// Where to load the model from; the binary fills it from `--url` or `LINGO_MODEL_URL`.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub url: Url,
}

/// Fetches the manifest over HTTP.
#[derive(Clone)]
pub struct HttpModelSource {
    client: Client,
    config: ModelConfig,
}

impl HttpModelSource {
    #[must_use]
    pub fn new(config: ModelConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.config.url
    }
}

#[async_trait]
impl ModelSource for HttpModelSource {
    async fn fetch(&self) -> Result<ModelArtifact, ModelLoadError> {
        let url = self.config.url.clone();
        info!(%url, "fetching sign detection model");

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "model fetch rejected");
            return Err(ModelLoadError::HttpStatus(response.status()));
        }
        let body = response.bytes().await?;
        ModelArtifact::from_manifest_json(url, &body)
    }
}

/// Serves an already-parsed manifest; used when the model ships with the binary.
#[derive(Clone, Debug)]
pub struct StaticModelSource {
    artifact: ModelArtifact,
}

impl StaticModelSource {
    #[must_use]
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }
}

#[async_trait]
impl ModelSource for StaticModelSource {
    async fn fetch(&self) -> Result<ModelArtifact, ModelLoadError> {
        Ok(self.artifact.clone())
    }
}
