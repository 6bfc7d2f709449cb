pub mod caption;
pub mod cascade;
pub mod codec;
pub mod config;
pub mod findings;
pub mod inference;
pub mod predictors;
pub mod registry;
pub mod routes;
pub mod validation;
pub mod vision;

pub use cascade::{Cascade, CascadeOutcome};
pub use codec::{CanonicalImage, CodecError, ImagePayload};
pub use config::AppConfig;
pub use registry::Registry;
