//! Data models for searchgate

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::services::quota::QuotaLimits;

// ============ Search Provider ============

/// A registered upstream search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchProvider {
    /// Storage and accounting key
    pub id: String,
    pub display_name: Option<String>,
    /// Origin that `/search` is appended to
    pub base_url: String,
    /// Injected as a bearer credential when present
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Lower is tried first
    pub priority: i64,
    pub active: bool,
    #[serde(flatten)]
    pub limits: QuotaLimits,
}

impl SearchProvider {
    /// Active, unlimited, priority 0 provider
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            base_url: base_url.into(),
            api_key: None,
            priority: 0,
            active: true,
            limits: QuotaLimits::unlimited(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_limits(mut self, limits: QuotaLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Display name, falling back to the id
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Provider as shown to admins (never exposes the raw key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub id: String,
    pub display_name: Option<String>,
    pub base_url: String,
    pub has_api_key: bool,
    pub api_key_fingerprint: Option<String>,
    pub priority: i64,
    pub active: bool,
    #[serde(flatten)]
    pub limits: QuotaLimits,
}

impl From<&SearchProvider> for ProviderSummary {
    fn from(provider: &SearchProvider) -> Self {
        Self {
            id: provider.id.clone(),
            display_name: provider.display_name.clone(),
            base_url: provider.base_url.clone(),
            has_api_key: provider.api_key.is_some(),
            api_key_fingerprint: provider.api_key.as_deref().map(key_fingerprint),
            priority: provider.priority,
            active: provider.active,
            limits: provider.limits,
        }
    }
}

/// Short, stable fingerprint of a secret for display
pub fn key_fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("sha256:{}", &digest[..12])
}

// ============ Admin Input ============

/// A number as admins send it: JSON number or numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for NumberInput {
    fn from(value: i64) -> Self {
        NumberInput::Integer(value)
    }
}

impl From<u32> for NumberInput {
    fn from(value: u32) -> Self {
        NumberInput::Integer(i64::from(value))
    }
}

impl From<&str> for NumberInput {
    fn from(value: &str) -> Self {
        NumberInput::Text(value.to_string())
    }
}

impl NumberInput {
    /// Integer value; `None` for an empty string
    fn to_integer(&self, field: &str) -> Result<Option<i64>> {
        let invalid = || Error::validation(format!("{} must be an integer", field));
        match self {
            NumberInput::Integer(n) => Ok(Some(*n)),
            NumberInput::Float(f) => whole_number(*f).map(Some).ok_or_else(invalid),
            NumberInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                if let Ok(n) = s.parse::<i64>() {
                    return Ok(Some(n));
                }
                s.parse::<f64>()
                    .ok()
                    .and_then(whole_number)
                    .map(Some)
                    .ok_or_else(invalid)
            }
        }
    }
}

fn whole_number(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// A boolean as admins send it: `true`, `1`, `"false"`, `"0"`, ...
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlagInput {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl From<bool> for FlagInput {
    fn from(value: bool) -> Self {
        FlagInput::Bool(value)
    }
}

impl FlagInput {
    fn to_bool(&self, field: &str) -> Result<Option<bool>> {
        let invalid = || Error::validation(format!("{} must be a boolean or 0/1", field));
        match self {
            FlagInput::Bool(b) => Ok(Some(*b)),
            FlagInput::Integer(0) => Ok(Some(false)),
            FlagInput::Integer(1) => Ok(Some(true)),
            FlagInput::Integer(_) => Err(invalid()),
            FlagInput::Text(s) => match s.trim().to_lowercase().as_str() {
                "" => Ok(None),
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(invalid()),
            },
        }
    }
}

/// Provider registration as received from the admin boundary
///
/// Every field is optional here; [`ProviderInput::validate`] turns it into a
/// [`SearchProvider`] or rejects it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderInput {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub priority: Option<NumberInput>,
    pub active: Option<FlagInput>,
    pub per_minute: Option<NumberInput>,
    pub per_hour: Option<NumberInput>,
    pub per_day: Option<NumberInput>,
    pub per_month: Option<NumberInput>,
}

impl ProviderInput {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// Validate into a full provider record (upsert replaces every field)
    pub fn validate(self) -> Result<SearchProvider> {
        let id = non_blank(self.id);
        let base_url = non_blank(self.base_url);
        let (Some(id), Some(base_url)) = (id, base_url) else {
            return Err(Error::validation("id and base_url are required"));
        };

        let url = reqwest::Url::parse(&base_url)
            .map_err(|e| Error::validation(format!("base_url is not a valid URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::validation("base_url must use http or https"));
        }

        let api_key = non_blank(self.api_key);
        if let Some(key) = &api_key {
            if HeaderValue::from_str(&format!("Bearer {}", key)).is_err() {
                return Err(Error::validation(
                    "api_key contains characters not allowed in an HTTP header",
                ));
            }
        }

        let priority = match &self.priority {
            Some(p) => p.to_integer("priority")?.unwrap_or(0),
            None => 0,
        };
        let active = match &self.active {
            Some(a) => a.to_bool("active")?.unwrap_or(true),
            None => true,
        };

        let limits = QuotaLimits {
            per_minute: threshold("per_minute", self.per_minute.as_ref())?,
            per_hour: threshold("per_hour", self.per_hour.as_ref())?,
            per_day: threshold("per_day", self.per_day.as_ref())?,
            per_month: threshold("per_month", self.per_month.as_ref())?,
        };

        Ok(SearchProvider {
            id,
            display_name: non_blank(self.display_name),
            base_url,
            api_key,
            priority,
            active,
            limits,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional threshold: absent or empty means unlimited
fn threshold(field: &str, value: Option<&NumberInput>) -> Result<Option<u32>> {
    let Some(n) = value.map(|v| v.to_integer(field)).transpose()?.flatten() else {
        return Ok(None);
    };
    u32::try_from(n)
        .map(Some)
        .map_err(|_| Error::validation(format!("{} must be a non-negative integer", field)))
}
