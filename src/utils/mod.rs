pub mod data_url;
pub mod logging;
pub mod time;

pub use data_url::DataUrl;
