pub mod config;
pub mod report;
pub mod store;
pub mod tools;
pub mod types;
pub mod validator;

pub use config::ServerConfig;
pub use store::{HEADER, RegistrationStore};
pub use tools::{ToolDispatcher, ToolError, tool_definitions};
pub use types::*;
pub use validator::{
    MAX_AGE_YEARS, MAX_NAME_LEN, MIN_NAME_LEN, validate_date_of_birth, validate_date_of_birth_on,
    validate_email, validate_name, validate_registration,
};
