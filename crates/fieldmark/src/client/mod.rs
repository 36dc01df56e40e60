pub mod auth;
pub mod blob;

pub use auth::UserAuth;
pub use blob::{BlobClient, BlobError};
