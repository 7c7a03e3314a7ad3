pub mod state;

pub use state::{ResourceInstance, StateDocument, StateResource, parse_state};
