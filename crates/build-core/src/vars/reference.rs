use std::fmt;

use crate::constants::LOCAL_VAR_SOURCE;
use crate::errors::VarError;

/// Referencia a una variable: `((path))`, `((source:path))` o
/// `((source:path.field.subfield))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub source: Option<String>,
    pub path: String,
    pub fields: Vec<String>,
}

impl VarRef {
    pub fn parse(raw: &str) -> Result<VarRef, VarError> {
        let raw = raw.trim();
        let invalid = || VarError::InvalidReference(raw.to_string());
        let (source, rest) = match raw.split_once(':') {
            Some((source, rest)) if !source.is_empty() => (Some(source.to_string()), rest),
            Some(_) => return Err(invalid()),
            None => (None, raw),
        };
        let mut segments = rest.split('.');
        let path = match segments.next() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(invalid()),
        };
        let fields: Vec<String> = segments.map(str::to_string).collect();
        if fields.iter().any(String::is_empty) {
            return Err(invalid());
        }
        Ok(VarRef { source, path, fields })
    }

    /// Variables ligadas localmente (`((.:name))`).
    pub fn is_local(&self) -> bool {
        self.source.as_deref() == Some(LOCAL_VAR_SOURCE)
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{source}:")?;
        }
        f.write_str(&self.path)?;
        for field in &self.fields {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}
