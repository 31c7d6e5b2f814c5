pub mod catalog;
pub mod compiler;
pub mod constraints;
pub mod context;
pub mod gems;
pub mod lora;
pub mod platform_rules;
pub mod scoring;
pub mod seed;
pub mod transforms;
pub mod types;

pub use self::catalog::{CatalogCache, CatalogSnapshot};
pub use self::compiler::compile;
pub use self::context::{CompileContext, UserBlueprintRegistration};
