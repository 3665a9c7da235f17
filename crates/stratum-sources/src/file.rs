//! JSON and TOML files as a config source.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use stratum_config::{Config, ConfigError, ConfigResult, DictConfig, Readable, Reloadable};
use tracing::{debug, info};

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Syntax of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// A JSON object.
    Json,
    /// A TOML document.
    Toml,
}

impl FileFormat {
    /// Guess the format from the file extension (`.json`, `.toml`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Toml => "toml",
        })
    }
}

/// How to open a [`FileConfig`].
#[derive(Debug, Clone)]
pub struct FileOptions {
    path: PathBuf,
    format: Option<FileFormat>,
    optional: bool,
}

impl FileOptions {
    /// Read the file as `format` regardless of its extension.
    #[must_use]
    pub fn format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Treat a nonexistent file as empty instead of failing.
    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Read and parse the file.
    ///
    /// # Errors
    ///
    /// See [`FileConfig::load`].
    pub fn load(self) -> ConfigResult<FileConfig> {
        let format = match self.format {
            Some(format) => format,
            None => FileFormat::from_path(&self.path).ok_or_else(|| ConfigError::ParseError {
                path: self.path.display().to_string(),
                message: "cannot tell the file format from its extension".to_owned(),
            })?,
        };
        let mut file = FileConfig {
            path: self.path,
            format,
            optional: self.optional,
            contents: DictConfig::new(),
        };
        file.contents = file.read()?;
        Ok(file)
    }
}

/// The top-level table of a JSON or TOML file.
///
/// The file is read once on load and again on every
/// [`reload`](Reloadable::reload). TOML dates and times become strings.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
    format: FileFormat,
    optional: bool,
    contents: DictConfig,
}

impl FileConfig {
    /// Options for opening `path`.
    pub fn options(path: impl Into<PathBuf>) -> FileOptions {
        FileOptions {
            path: path.into(),
            format: None,
            optional: false,
        }
    }

    /// Load a required file, detecting the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read,
    /// [`ConfigError::ValidationError`] if it exceeds 1 MiB, and
    /// [`ConfigError::ParseError`] if the format is unknown, the content is
    /// malformed or the top level is not a table.
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        Self::options(path).load()
    }

    /// The file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file format.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    fn read(&self) -> ConfigResult<DictConfig> {
        let path_str = self.path.display().to_string();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.optional => {
                debug!(path = %path_str, "optional config file not found, using empty config");
                return Ok(DictConfig::new());
            },
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path_str,
                    source: e,
                });
            },
        };

        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::validation(
                path_str,
                format!(
                    "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                    content.len()
                ),
            ));
        }

        let entries = match self.format {
            FileFormat::Json => parse_json(&content, &path_str)?,
            FileFormat::Toml => parse_toml(&content, &path_str)?,
        };
        info!(path = %path_str, format = %self.format, keys = entries.len(), "loaded config file");
        Ok(DictConfig::from(entries))
    }
}

fn parse_json(content: &str, path: &str) -> ConfigResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.to_owned(),
        message: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::ParseError {
            path: path.to_owned(),
            message: "top level must be an object".to_owned(),
        }),
    }
}

fn parse_toml(content: &str, path: &str) -> ConfigResult<Map<String, Value>> {
    let table: toml::Table = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.to_owned(),
        message: e.to_string(),
    })?;
    Ok(table
        .into_iter()
        .map(|(k, v)| (k, toml_to_json(v)))
        .collect())
}

/// Convert a TOML value to JSON. Non-finite floats have no JSON form and
/// become `null`.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

impl Readable for FileConfig {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        self.contents.get(key)
    }

    fn keys(&self) -> Vec<String> {
        self.contents.keys()
    }

    fn len(&self) -> usize {
        self.contents.len()
    }
}

impl Reloadable for FileConfig {
    /// Re-read the file. On failure the previous contents are kept.
    fn reload(&mut self) -> ConfigResult<()> {
        self.contents = self.read()?;
        Ok(())
    }
}

impl Config for FileConfig {}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"message": "Hi", "nested": {"a": [1, 2]}}"#).unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.format(), FileFormat::Json);
        assert_eq!(file.get("message").unwrap(), json!("Hi"));
        assert_eq!(file.get("nested").unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "message = \"Hi\"\nratio = 0.5\nwhen = 1979-05-27\n\n[server]\nport = 8080\n",
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.get("message").unwrap(), json!("Hi"));
        assert_eq!(file.get("ratio").unwrap(), json!(0.5));
        assert_eq!(file.get("when").unwrap(), json!("1979-05-27"));
        assert_eq!(file.get("server").unwrap(), json!({"port": 8080}));
    }

    #[test]
    fn test_explicit_format_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.conf");
        fs::write(&path, "a = 1").unwrap();

        assert!(matches!(
            FileConfig::load(&path),
            Err(ConfigError::ParseError { .. })
        ));
        let file = FileConfig::options(&path)
            .format(FileFormat::Toml)
            .load()
            .unwrap();
        assert_eq!(file.get("a").unwrap(), json!(1));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            FileConfig::load(&path),
            Err(ConfigError::ReadError { .. })
        ));
        let file = FileConfig::options(&path).optional(true).load().unwrap();
        assert!(file.is_empty());
    }

    #[test]
    fn test_load_with_active_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("logged.json");
            fs::write(&path, r#"{"a": 1}"#).unwrap();
            assert_eq!(FileConfig::load(&path).unwrap().len(), 1);

            let absent = dir.path().join("absent.toml");
            let file = FileConfig::options(&absent).optional(true).load().unwrap();
            assert!(file.is_empty());
        });
    }

    #[test]
    fn test_top_level_must_be_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            FileConfig::load(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_malformed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "this is [not toml").unwrap();
        assert!(matches!(
            FileConfig::load(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        let padding = "x".repeat(MAX_CONFIG_FILE_SIZE);
        fs::write(&path, format!(r#"{{"pad": "{padding}"}}"#)).unwrap();
        assert!(FileConfig::load(&path).unwrap_err().is_validation());
    }

    #[test]
    fn test_reload_rereads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        fs::write(&path, r#"{"v": 1}"#).unwrap();
        let mut file = FileConfig::load(&path).unwrap();

        fs::write(&path, r#"{"v": 2, "w": 3}"#).unwrap();
        assert_eq!(file.get("v").unwrap(), json!(1));
        file.reload().unwrap();
        assert_eq!(file.get("v").unwrap(), json!(2));
        assert_eq!(file.len(), 2);

        fs::write(&path, "{broken").unwrap();
        assert!(file.reload().is_err());
        assert_eq!(file.get("v").unwrap(), json!(2));
    }
}
