//! Variables del build.
//!
//! - `VarRef`: referencia parseada `((source:path.field))`.
//! - `VariableScope`: pila de bindings locales sobre un credential manager.
//! - `CredentialTracker`: valores de credenciales ya leídos, para redactar.
//! - `template`: evaluación de placeholders dentro de valores JSON.

mod credentials;
mod reference;
mod scope;
pub mod template;

pub use credentials::{CredentialManager, CredentialTracker, InMemoryCredentials};
pub use reference::VarRef;
pub use scope::VariableScope;
pub use template::{evaluate, evaluate_map, Resolve};
