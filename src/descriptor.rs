use std::{collections::BTreeMap, path::Path};

use serde::Serialize;

use crate::config::{API_KEY_VAR, ENDPOINT_VAR};

/// Description of the image-based function handed to the provisioning engine.
///
/// Only [`crate::stack::MomentoLambdaStack::build`] constructs it, after both required values
/// have been validated. It is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    name: &'static str,
    image_source: &'static str,
    #[serde(rename = "memoryMB")]
    memory_mb: u32,
    timeout_seconds: u32,
    environment: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    pub const NAME: &'static str = "MomentoDockerLambda";
    /// Build context, relative to the project directory.
    pub const IMAGE_SOURCE: &'static str = "docker";
    pub const MEMORY_MB: u32 = 128;
    pub const TIMEOUT_SECONDS: u32 = 30;

    const MASK: &'static str = "****";

    pub(crate) fn new(api_key: &str, endpoint: &str) -> Self {
        let environment = BTreeMap::from([
            (API_KEY_VAR.to_string(), api_key.to_string()),
            (ENDPOINT_VAR.to_string(), endpoint.to_string()),
        ]);

        Self {
            name: Self::NAME,
            image_source: Self::IMAGE_SOURCE,
            memory_mb: Self::MEMORY_MB,
            timeout_seconds: Self::TIMEOUT_SECONDS,
            environment,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn image_source(&self) -> &Path {
        Path::new(self.image_source)
    }

    pub fn memory_mb(&self) -> u32 {
        self.memory_mb
    }

    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// A copy that is safe to print, with the API key replaced.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if let Some(api_key) = masked.environment.get_mut(API_KEY_VAR) {
            *api_key = Self::MASK.into();
        }
        masked
    }
}
