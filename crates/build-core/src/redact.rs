//! Redacción de secretos en texto observable (logs, inputs de políticas).
//!
//! Cada valor conocido se parte en líneas; cada línea se recorta y las de un
//! solo carácter se descartan (demasiado propensas a falsos positivos). Todas
//! las apariciones de las líneas restantes se reemplazan por
//! `REDACTED_PLACEHOLDER`. Así un secreto multilínea (p.ej. un PEM) se
//! redacta aunque aparezca reindentado.

use std::sync::Arc;

use serde_json::Value;

use crate::constants::REDACTED_PLACEHOLDER;
use crate::vars::CredentialTracker;

/// Redactor ligado al tracker de credenciales del build: siempre usa los
/// valores leídos hasta el momento de redactar.
#[derive(Debug, Clone)]
pub struct Redactor {
    tracker: Arc<CredentialTracker>,
}

impl Redactor {
    pub fn new(tracker: Arc<CredentialTracker>) -> Self {
        Self { tracker }
    }

    pub fn redact(&self, text: &str) -> String {
        redact_values(text, &self.tracker.values())
    }

    /// Redacta cada string dentro de `value`. Las claves de los objetos no se
    /// tocan.
    pub fn redact_value(&self, value: &Value) -> Value {
        let values = self.tracker.values();
        redact_json(value, &values)
    }
}

fn redact_json(value: &Value, values: &[String]) -> Value {
    match value {
        Value::String(s) => Value::String(redact_values(s, values)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_json(v, values)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), redact_json(v, values))).collect()),
        other => other.clone(),
    }
}

/// Reemplaza en `text` toda aparición de las líneas significativas de
/// `values`.
///
/// Los rangos se calculan sobre el texto original y se fusionan antes de
/// escribir, de modo que el placeholder nunca se vuelve a redactar.
pub fn redact_values(text: &str, values: &[String]) -> String {
    let needles: Vec<&str> = values.iter()
                                   .flat_map(|v| v.split('\n'))
                                   .map(str::trim)
                                   .filter(|line| line.chars().count() > 1)
                                   .collect();
    if needles.is_empty() {
        return text.to_string();
    }

    let mut ranges: Vec<(usize, usize)> = needles.iter()
                                                 .flat_map(|needle| {
                                                     text.match_indices(needle).map(|(start, m)| (start, start + m.len()))
                                                 })
                                                 .collect();
    if ranges.is_empty() {
        return text.to_string();
    }
    ranges.sort_unstable();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut iter = ranges.into_iter().peekable();
    while let Some((start, mut end)) = iter.next() {
        while let Some(&(next_start, next_end)) = iter.peek() {
            if next_start > end {
                break;
            }
            end = end.max(next_end);
            iter.next();
        }
        out.push_str(&text[cursor..start]);
        out.push_str(REDACTED_PLACEHOLDER);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}
