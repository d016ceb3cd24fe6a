//! Requested effects.
//!
//! An [`Operation`] carries only what is needed to check it against a
//! manifest and to run it. Operations are built per request and dropped
//! afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::GuardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = GuardError;

    /// Only GET and POST are ever issued.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(GuardError::InvalidRequest(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a network operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub data: Option<Vec<u8>>,
}

impl NetworkRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            data: None,
        }
    }

    pub fn post(url: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::new(),
            data: Some(data),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Parses and checks the URL: it must have both a scheme and a host.
    pub fn parsed_url(&self) -> Result<url::Url, GuardError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| GuardError::InvalidRequest(format!("invalid URL '{}': {e}", self.url)))?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(GuardError::InvalidRequest(format!(
                "invalid URL '{}': missing host",
                self.url
            )));
        }
        Ok(parsed)
    }
}

/// One requested effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    FileRead { path: String },
    FileWrite { path: String, data: Vec<u8> },
    NetworkRequest(NetworkRequest),
    GpuCompute { shader_code: String, data: Vec<u8> },
    SensorRead { sensor_type: String },
    CameraCapture,
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::FileRead { .. } => "FileRead",
            Operation::FileWrite { .. } => "FileWrite",
            Operation::NetworkRequest(_) => "NetworkRequest",
            Operation::GpuCompute { .. } => "GpuCompute",
            Operation::SensorRead { .. } => "SensorRead",
            Operation::CameraCapture => "CameraCapture",
        }
    }
}
