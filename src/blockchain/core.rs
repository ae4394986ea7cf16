// Blocks and the ledger live in `chain`, vote counting in `state`, and the
// integrity checks in `validation`.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
pub use state::*;
pub use validation::*;
