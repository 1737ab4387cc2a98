mod auth;
mod ledger;

pub use auth::TokenManager;
pub use auth::token_from_response;
pub use ledger::MigrationLedger;
