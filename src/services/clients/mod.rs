pub mod admin_api;
pub mod example_api;

pub use admin_api::AdminApiClient;
pub use example_api::{CreateExternalUser, ExampleApiClient, ExternalUser, UpdateExternalUser};
