//! The prelude exports the types which almost every user of the
//! host loop needs: the timing configuration and the fault taxonomy.
pub use super::fault::Fault;
pub use super::timing::*;
