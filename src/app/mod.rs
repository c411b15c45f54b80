// ==========================================
// Patient Registry - application layer
// ==========================================
// Wires repositories, configuration and APIs together
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
