mod checksum;
mod fetch;
mod variants;

pub use checksum::run_checksum;
pub use fetch::{run_fetch, FetchArgs};
pub use variants::run_variants;
