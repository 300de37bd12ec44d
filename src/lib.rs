pub mod api;
pub mod cache;
pub mod core;
pub mod minhash;
pub mod normalize;
pub mod pipeline;
pub mod rate_limit;
pub mod recruiter;
pub mod upstream;

pub use core::types;
pub use core::AppState;
