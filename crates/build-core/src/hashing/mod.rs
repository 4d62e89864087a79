//! Hashing estable sobre JSON canónico.
//!
//! Las implementaciones en memoria de configs y caches de recursos usan estos
//! hashes como identidad: el mismo `(type, source, version, params)` siempre
//! produce la misma clave, sin importar el orden de las claves del JSON.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_str, hash_value};
