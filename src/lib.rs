pub mod config;
pub mod importer;
pub mod record;
pub mod store;

pub mod util {
    pub mod env;
}

pub use config::ImportConfig;
pub use importer::{run_import, ImportSummary};
pub use record::{UserRecord, UserRow};
