//! Deterministic text normalizers feeding the recruiter and the pipeline's
//! URL-exact pass.

pub mod title;
pub mod url;
pub mod variants;

pub use title::normalize_title;
pub use url::normalize_url;
pub use variants::title_variants;
