mod config;
mod prediction;
mod session;

pub use config::ClientConfig;
pub use prediction::{ClientPredictor, PredictionRecord, Reconciliation};
pub use session::{ClientSession, RemoteEntity, SessionStats};
