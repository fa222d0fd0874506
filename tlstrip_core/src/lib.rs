pub mod error;
pub mod record;
pub mod relay;
pub mod state;
