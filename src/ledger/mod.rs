// Stellar ledger access: keys, transaction envelopes and the Horizon client
pub mod client;
pub mod envelope;
pub mod horizon;
pub mod keys;
pub mod models;

pub use horizon::{HorizonClient, StellarConfig};
