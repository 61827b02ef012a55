//! Mutator (§4.7): hot-spot scoring, an enumerated schema library, and
//! ΔG-filtered mutation vector synthesis.

pub mod hotspot;
pub mod schema;
pub mod vector;

pub use hotspot::{score_hot_spot, HotSpotScore};
pub use schema::{apply_schema, Schema};
pub use vector::{synthesize, MutationVector};
