mod block;
mod blueprint;
mod filter;
mod generated_prompt;
mod lora;
mod profile;
mod user;

pub use block::*;
pub use blueprint::*;
pub use filter::*;
pub use generated_prompt::*;
pub use lora::*;
pub use profile::*;
pub use user::*;
