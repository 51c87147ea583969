//! On-disk JSON representations of library entities.
//!
//! Encoding is canonical: the same system value always produces the same
//! bytes, so the git blob SHA of an encoded value can be compared with the
//! SHA GitHub reports for the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::library::{SystemPrompt, SystemVariable, SystemVersion, VariableType, VersionStatus};
use super::paths::{GLOBALS_FILE, PROMPT_FILE, VARIABLES_FILE, VERSION_FILE};
use super::template;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{file} is not valid JSON for its schema: {source}")]
    Json {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{file} failed validation: {reason}")]
    Invalid { file: &'static str, reason: String },
    #[error("template failed validation: {0}")]
    Template(#[from] template::TemplateError),
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptFile {
    pub uuid: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(rename = "latestVersion")]
    pub latest_version: Option<String>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionFile {
    pub uuid: Uuid,
    pub config: Option<Value>,
    pub status: VersionStatus,
    pub version: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableFile {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub uuid: Uuid,
    pub required: bool,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
    pub default_value: Option<String>,
}

impl PromptFile {
    pub fn from_system(prompt: &SystemPrompt) -> Self {
        Self {
            uuid: prompt.uuid,
            name: prompt.name.clone(),
            slug: prompt.slug.clone(),
            latest_version: prompt.latest_version().map(str::to_string),
            created_at: prompt.created_at,
            updated_at: prompt.updated_at,
        }
    }
}

impl VersionFile {
    pub fn from_system(version: &SystemVersion) -> Self {
        Self {
            uuid: version.uuid,
            config: version.config.clone(),
            status: version.status,
            version: version.version.clone(),
            created_at: version.created_at,
            updated_at: version.updated_at,
        }
    }
}

impl From<&SystemVariable> for VariableFile {
    fn from(variable: &SystemVariable) -> Self {
        Self {
            name: variable.name.clone(),
            var_type: variable.var_type,
            uuid: variable.uuid,
            required: variable.required,
            created_at: variable.created_at,
            updated_at: variable.updated_at,
            default_value: variable.default_value.clone(),
        }
    }
}

impl From<VariableFile> for SystemVariable {
    fn from(file: VariableFile) -> Self {
        Self {
            uuid: file.uuid,
            name: file.name,
            var_type: file.var_type,
            required: file.required,
            default_value: file.default_value,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

fn to_pretty<T: Serialize>(value: &T) -> String {
    // Serializing plain data structs and `serde_json::Value` cannot fail.
    serde_json::to_string_pretty(value).unwrap_or_default()
}

pub fn encode_prompt(prompt: &SystemPrompt) -> String {
    to_pretty(&PromptFile::from_system(prompt))
}

pub fn encode_version(version: &SystemVersion) -> String {
    to_pretty(&VersionFile::from_system(version))
}

/// Variables are written sorted by name so row order never changes the bytes.
pub fn encode_variables(variables: &[SystemVariable]) -> String {
    let mut files: Vec<VariableFile> = variables.iter().map(VariableFile::from).collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));
    to_pretty(&files)
}

pub fn encode_globals(content: &Value) -> String {
    to_pretty(content)
}

pub fn decode_prompt(raw: &str, expected_slug: &str) -> Result<PromptFile, CodecError> {
    let file: PromptFile = serde_json::from_str(raw).map_err(|source| CodecError::Json {
        file: PROMPT_FILE,
        source,
    })?;
    if file.slug != expected_slug {
        return Err(CodecError::Invalid {
            file: PROMPT_FILE,
            reason: format!(
                "slug '{}' does not match directory '{}'",
                file.slug, expected_slug
            ),
        });
    }
    if file.name.trim().is_empty() {
        return Err(CodecError::Invalid {
            file: PROMPT_FILE,
            reason: "name must not be empty".to_string(),
        });
    }
    Ok(file)
}

pub fn decode_version(raw: &str, expected_version: &str) -> Result<VersionFile, CodecError> {
    let file: VersionFile = serde_json::from_str(raw).map_err(|source| CodecError::Json {
        file: VERSION_FILE,
        source,
    })?;
    if file.version != expected_version {
        return Err(CodecError::Invalid {
            file: VERSION_FILE,
            reason: format!(
                "version '{}' does not match directory '{}'",
                file.version, expected_version
            ),
        });
    }
    if let Some(config) = &file.config {
        if !config.is_object() {
            return Err(CodecError::Invalid {
                file: VERSION_FILE,
                reason: "config must be an object or null".to_string(),
            });
        }
    }
    Ok(file)
}

pub fn decode_variables(raw: &str) -> Result<Vec<VariableFile>, CodecError> {
    let files: Vec<VariableFile> = serde_json::from_str(raw).map_err(|source| CodecError::Json {
        file: VARIABLES_FILE,
        source,
    })?;

    let mut seen = std::collections::HashSet::new();
    for variable in &files {
        if !is_identifier(&variable.name) {
            return Err(CodecError::Invalid {
                file: VARIABLES_FILE,
                reason: format!("'{}' is not a valid variable name", variable.name),
            });
        }
        if !seen.insert(variable.name.as_str()) {
            return Err(CodecError::Invalid {
                file: VARIABLES_FILE,
                reason: format!("variable '{}' is declared twice", variable.name),
            });
        }
    }
    Ok(files)
}

pub fn decode_globals(raw: &str) -> Result<Value, CodecError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| CodecError::Json {
        file: GLOBALS_FILE,
        source,
    })?;
    if !value.is_object() {
        return Err(CodecError::Invalid {
            file: GLOBALS_FILE,
            reason: "global context must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

/// Content bodies are stored verbatim; decoding only runs the template check.
pub fn decode_content(raw: &str) -> Result<String, CodecError> {
    template::validate(raw)?;
    Ok(raw.to_string())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
