// Upload/predict workflow - sequences the network calls against observable
// state and keeps each action to at most one in-flight request.

pub mod backend_client;
pub mod orchestrator;
pub mod state;

pub use backend_client::{BackendApi, BackendClient};
pub use orchestrator::Orchestrator;
pub use state::{PredictionResult, RequestState, TreatmentInfo};
