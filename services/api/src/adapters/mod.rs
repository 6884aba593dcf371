pub mod db;
pub mod sst;
pub mod verse_api;

pub use db::DbAdapter;
pub use sst::OpenAiSstAdapter;
pub use verse_api::AlQuranCloudAdapter;
