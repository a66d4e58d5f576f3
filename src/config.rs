use serde::{Deserialize, Serialize};

/// Configuration for Swagger document generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwaggerConfig {
    /// API metadata rendered into the `info` section
    pub info: ApiInfo,

    /// Base URL of the API. Its authority becomes `host` and its scheme
    /// becomes the single entry of `schemes`; either key is omitted when
    /// the corresponding URL component is absent or the URL is empty.
    pub base_url: String,

    /// Pretty-print exported JSON
    pub pretty_print: bool,
}

/// API information section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
}

impl Default for SwaggerConfig {
    fn default() -> Self {
        Self {
            info: ApiInfo {
                title: "API Documentation".to_string(),
                description: None,
                version: "1.0.0".to_string(),
            },
            base_url: String::new(),
            pretty_print: true,
        }
    }
}

impl SwaggerConfig {
    /// Create a new configuration with custom API info
    pub fn new(title: &str, version: &str) -> Self {
        let mut config = Self::default();
        config.info.title = title.to_string();
        config.info.version = version.to_string();
        config
    }

    /// Set the API description
    pub fn with_description(mut self, description: &str) -> Self {
        self.info.description = Some(description.to_string());
        self
    }

    /// Set the base URL used to derive `host` and `schemes`
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Set JSON pretty-printing
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }
}
