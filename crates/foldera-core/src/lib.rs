pub mod config;
pub mod router;
pub mod scheduling;
pub mod solver;

pub use config::*;
pub use router::*;
pub use scheduling::*;
pub use solver::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPolicy {
    pub primary: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
}
