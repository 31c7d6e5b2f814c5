pub mod blocks;
pub mod blueprints;
pub mod filters;
pub mod generated_prompts;
pub mod loras;
pub mod profiles;
pub mod users;
