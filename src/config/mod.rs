pub mod compile;
pub mod loader;
pub mod models;
pub mod validation;

pub use compile::{CompileError, compile_rule, compile_rules};
pub use loader::load_config;
pub use models::*;
pub use validation::{ConfigValidator, ValidationError, ValidationResult};
