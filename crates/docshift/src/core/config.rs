//! Configuration loading and management.
//!
//! `ServiceConfig` can be loaded from TOML, YAML or JSON, discovered as `docshift.toml` in the
//! current directory or one of its parents, or built programmatically. Environment overrides are
//! applied on top through [`ServiceConfig::apply_env_overrides`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::package::PackageFormat;
use crate::{DocshiftError, Result};

/// Name of the configuration file searched for by [`ServiceConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "docshift.toml";

const MIB: usize = 1024 * 1024;

/// Main service configuration.
///
/// # Example
///
/// ```rust
/// use docshift::ServiceConfig;
///
/// let config = ServiceConfig::default();
/// assert_eq!(config.limits.max_files, 10);
///
/// // let config = ServiceConfig::from_toml_file("docshift.toml")?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Root for staged uploads, conversion runs and converted outputs
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub office: OfficeConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix the operation routes are mounted under
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

/// Upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted single upload
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,

    /// Largest accepted request body (all multipart fields together)
    #[serde(default = "default_max_request_body_bytes")]
    pub max_request_body_bytes: usize,

    /// Most files accepted by one merge or OCR request
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

/// Headless office suite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeConfig {
    /// Explicit path to `soffice` (None = discover from install locations and PATH)
    #[serde(default)]
    pub binary: Option<PathBuf>,

    /// Upper bound for a single conversion subprocess
    #[serde(default = "default_office_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound for the `--version` availability probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Fall back to Microsoft Word automation on Windows
    #[serde(default = "default_true")]
    pub enable_word_automation: bool,
}

/// Tesseract command-line settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_tesseract")]
    pub binary: PathBuf,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`
    #[serde(default = "default_eng")]
    pub language: String,

    /// Page segmentation mode
    #[serde(default = "default_psm")]
    pub psm: u8,

    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

/// Response packaging defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Used when a request does not ask for a format explicitly
    #[serde(default)]
    pub default_format: PackageFormat,
}

fn default_temp_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\pdf-tools")
    } else {
        std::env::temp_dir().join("pdf-tools")
    }
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3333
}
fn default_base_path() -> String {
    "/api".to_string()
}
fn default_max_file_bytes() -> usize {
    50 * MIB
}
fn default_max_request_body_bytes() -> usize {
    100 * MIB
}
fn default_max_files() -> usize {
    10
}
fn default_office_timeout_secs() -> u64 {
    300
}
fn default_probe_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_tesseract() -> PathBuf {
    PathBuf::from("tesseract")
}
fn default_eng() -> String {
    "eng".to_string()
}
fn default_psm() -> u8 {
    3
}
fn default_ocr_timeout_secs() -> u64 {
    120
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            office: OfficeConfig::default(),
            ocr: OcrConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_path: default_base_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_request_body_bytes: default_max_request_body_bytes(),
            max_files: default_max_files(),
        }
    }
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            binary: None,
            timeout_secs: default_office_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            enable_word_automation: default_true(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: default_tesseract(),
            language: default_eng(),
            psm: default_psm(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DocshiftError::Validation` if the file doesn't exist or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| DocshiftError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| DocshiftError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| DocshiftError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load a configuration file, choosing the format from its extension.
    ///
    /// `.yaml`/`.yml` and `.json` are recognised; anything else is parsed as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Discover `docshift.toml` in the current directory or its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(DocshiftError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Load from an explicit file, else from discovery, else defaults; then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => match Self::discover()? {
                Some(config) => {
                    tracing::info!("Loaded configuration from discovered {}", CONFIG_FILE_NAME);
                    config
                }
                None => {
                    tracing::debug!("No config file found, using default configuration");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply overrides from the process environment. See [`ServiceConfig::apply_overrides_from`].
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// Recognised keys, first match wins where two are listed:
    ///
    /// - `DOCSHIFT_TMP_DIR` / `TMP_DIR` - temp root
    /// - `DOCSHIFT_SOFFICE_PATH` / `SOFFICE_PATH` - office binary
    /// - `DOCSHIFT_TESSERACT_PATH` - tesseract binary
    /// - `DOCSHIFT_HOST`
    /// - `DOCSHIFT_PORT` / `PORT`
    /// - `DOCSHIFT_MAX_UPLOAD_SIZE_MB` - per-file limit; the request body limit grows to match if smaller
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `DocshiftError::Validation` when a numeric override does not parse.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&'static str]| first_set(&lookup, keys);

        if let Some((_, dir)) = get(&["DOCSHIFT_TMP_DIR", "TMP_DIR"]) {
            self.temp_dir = PathBuf::from(dir);
        }

        if let Some((_, binary)) = get(&["DOCSHIFT_SOFFICE_PATH", "SOFFICE_PATH"]) {
            self.office.binary = Some(PathBuf::from(binary));
        }

        if let Some((_, binary)) = get(&["DOCSHIFT_TESSERACT_PATH"]) {
            self.ocr.binary = PathBuf::from(binary);
        }

        if let Some((_, host)) = get(&["DOCSHIFT_HOST"]) {
            self.server.host = host.trim().to_string();
        }

        if let Some((key, port)) = get(&["DOCSHIFT_PORT", "PORT"]) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| DocshiftError::validation(format!("Invalid {}='{}': {}", key, port, e)))?;
        }

        if let Some((key, mb)) = get(&["DOCSHIFT_MAX_UPLOAD_SIZE_MB"]) {
            let mb: usize = mb
                .trim()
                .parse()
                .map_err(|e| DocshiftError::validation(format!("Invalid {}='{}': {}", key, mb, e)))?;
            if mb == 0 {
                return Err(DocshiftError::validation(format!("{} must be greater than zero", key)));
            }

            self.limits.max_file_bytes = mb * MIB;
            self.limits.max_request_body_bytes = self.limits.max_request_body_bytes.max(self.limits.max_file_bytes);
            tracing::info!("Upload size limit configured from environment: {} MB", mb);
        }

        Ok(())
    }

    /// Directory uploads are staged in.
    pub fn uploads_dir(&self) -> PathBuf {
        self.temp_dir.join("uploads")
    }
}

/// First key in `keys` with a non-blank value, together with that value.
fn first_set<F>(lookup: &F, keys: &[&'static str]) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key).map(|value| (*key, value)))
        .find(|(_, value)| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DocshiftError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.port, 3333);
        assert_eq!(config.server.base_path, "/api");
        assert_eq!(config.limits.max_file_bytes, 50 * 1024 * 1024);
        assert_eq!(config.limits.max_request_body_bytes, 100 * 1024 * 1024);
        assert_eq!(config.office.timeout_secs, 300);
        assert!(config.office.binary.is_none());
        assert!(config.office.enable_word_automation);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.output.default_format, PackageFormat::Raw);
        assert!(config.temp_dir.ends_with("pdf-tools"));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docshift.toml");

        fs::write(
            &config_path,
            r#"
temp_dir = "/srv/docshift"

[server]
port = 8080

[office]
binary = "/opt/libreoffice/program/soffice"
timeout_secs = 60

[output]
default_format = "zip"
        "#,
        )
        .unwrap();

        let config = ServiceConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(config.temp_dir, PathBuf::from("/srv/docshift"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.office.binary.as_deref(),
            Some(Path::new("/opt/libreoffice/program/soffice"))
        );
        assert_eq!(config.office.timeout_secs, 60);
        assert_eq!(config.office.probe_timeout_secs, 30);
        assert_eq!(config.output.default_format, PackageFormat::Zip);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docshift.yaml");

        fs::write(
            &config_path,
            "limits:\n  max_files: 4\nocr:\n  language: deu\n  psm: 6\n",
        )
        .unwrap();

        let config = ServiceConfig::from_file(&config_path).unwrap();
        assert_eq!(config.limits.max_files, 4);
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.psm, 6);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docshift.json");

        fs::write(&config_path, r#"{"server": {"base_path": "/v1"}}"#).unwrap();

        let config = ServiceConfig::from_file(&config_path).unwrap();
        assert_eq!(config.server.base_path, "/v1");
    }

    #[test]
    fn test_invalid_toml_is_validation_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docshift.toml");
        fs::write(&config_path, "[server\nport = ").unwrap();

        let err = ServiceConfig::from_toml_file(&config_path).unwrap_err();
        assert!(matches!(err, DocshiftError::Validation { .. }));
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let err = ServiceConfig::from_toml_file("/nonexistent/docshift.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    #[serial_test::serial]
    fn test_discover_docshift_toml() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("docshift.toml"), "[server]\nport = 9000\n").unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();

        let result = std::panic::catch_unwind(|| {
            let config = ServiceConfig::discover().unwrap();
            assert_eq!(config.unwrap().server.port, 9000);
        });

        std::env::set_current_dir(&original_dir).unwrap();

        if let Err(e) = result {
            std::panic::resume_unwind(e);
        }
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut config = ServiceConfig::default();
        config
            .apply_overrides_from(lookup_from(&[
                ("TMP_DIR", "/data/tmp"),
                ("SOFFICE_PATH", "/usr/local/bin/soffice"),
                ("DOCSHIFT_TESSERACT_PATH", "/usr/local/bin/tesseract"),
                ("DOCSHIFT_HOST", "0.0.0.0"),
                ("PORT", "4000"),
            ]))
            .unwrap();

        assert_eq!(config.temp_dir, PathBuf::from("/data/tmp"));
        assert_eq!(config.office.binary, Some(PathBuf::from("/usr/local/bin/soffice")));
        assert_eq!(config.ocr.binary, PathBuf::from("/usr/local/bin/tesseract"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_prefixed_env_override_wins() {
        let mut config = ServiceConfig::default();
        config
            .apply_overrides_from(lookup_from(&[
                ("DOCSHIFT_TMP_DIR", "/preferred"),
                ("TMP_DIR", "/fallback"),
                ("DOCSHIFT_PORT", "5000"),
                ("PORT", "6000"),
            ]))
            .unwrap();

        assert_eq!(config.temp_dir, PathBuf::from("/preferred"));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = ServiceConfig::default();
        config
            .apply_overrides_from(lookup_from(&[("SOFFICE_PATH", ""), ("PORT", "  ")]))
            .unwrap();

        assert!(config.office.binary.is_none());
        assert_eq!(config.server.port, 3333);
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_overrides_from(lookup_from(&[("PORT", "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_upload_size_override() {
        let mut config = ServiceConfig::default();
        config
            .apply_overrides_from(lookup_from(&[("DOCSHIFT_MAX_UPLOAD_SIZE_MB", "200")]))
            .unwrap();

        assert_eq!(config.limits.max_file_bytes, 200 * 1024 * 1024);
        assert_eq!(config.limits.max_request_body_bytes, 200 * 1024 * 1024);

        let mut config = ServiceConfig::default();
        config
            .apply_overrides_from(lookup_from(&[("DOCSHIFT_MAX_UPLOAD_SIZE_MB", "10")]))
            .unwrap();
        assert_eq!(config.limits.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.limits.max_request_body_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_zero_upload_size_rejected() {
        let mut config = ServiceConfig::default();
        assert!(
            config
                .apply_overrides_from(lookup_from(&[("DOCSHIFT_MAX_UPLOAD_SIZE_MB", "0")]))
                .is_err()
        );
    }

    #[test]
    fn test_uploads_dir() {
        let config = ServiceConfig {
            temp_dir: PathBuf::from("/srv/tmp"),
            ..Default::default()
        };
        assert_eq!(config.uploads_dir(), PathBuf::from("/srv/tmp/uploads"));
    }
}
