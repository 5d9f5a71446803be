pub mod id;
pub mod model;
pub mod validate;

pub use id::{ComponentId, IdGenerator, ZoneId};
pub use model::*;
pub use validate::{Diagnostic, Severity, is_well_formed, validate_document};
