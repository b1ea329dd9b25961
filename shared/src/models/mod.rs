//! Domain models for the poultry ledger

mod cage;
mod cycle;
mod production;
mod record;
mod sale;
mod vaccination;

pub use cage::*;
pub use cycle::*;
pub use production::*;
pub use record::{Collection, Record};
pub use sale::*;
pub use vaccination::*;
