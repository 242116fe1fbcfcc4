//! Database schema and initialization

pub mod init;

pub use init::*;

/// Prefix applied to every attached-field key written by the sync layer
pub const META_PREFIX: &str = "_transcriptions_";

/// Attached-field key holding the external identifier
pub const EXTERNAL_ID_META_KEY: &str = "_transcriptions_external_id";

/// Taxonomy name of the maqam tag vocabulary
pub const MAQAM_TAXONOMY: &str = "maqam";
