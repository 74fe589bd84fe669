//! FFI bindings for UniFFI export
//!
//! ## Usage from Swift
//!
//! ```swift
//! import MailIndexFFI
//!
//! initializeLogging(callback: myLogCallback, maxLevel: .info)
//! try initLibrary(configJson: nil)
//!
//! let index = try IndexService.open(path: "/Users/me/mail", readOnly: false)
//! let stats = try index.scan()
//! let unread = try index.searchThreads(query: "tag:unread", sort: .newestFirst, limit: 50)
//!
//! teardownLibrary()
//! ```

mod logging;
mod service;
mod types;

use std::sync::Arc;

pub use logging::{init_ffi_logger, set_log_callback, set_log_level};
pub use service::*;
pub use types::*;

use crate::config::IndexConfig;
use crate::context;

/// Text for a numeric status code
#[uniffi::export]
pub fn status_to_string(code: i32) -> String {
    crate::status::status_to_string(code).to_string()
}

/// Initialize the library context.
///
/// `config_json` overrides the configuration file when given; otherwise
/// `mailindex.json` and `MAILINDEX_DATABASE` are consulted.
#[uniffi::export]
pub fn init_library(config_json: Option<String>) -> Result<(), IndexError> {
    let config = match config_json {
        Some(json) => IndexConfig::from_json(&json),
        None => IndexConfig::load(),
    }
    .map_err(|e| crate::error::Error::backend(format!("{:#}", e)))?;
    context::init(config);
    Ok(())
}

/// Close every open handle and drop the library context
#[uniffi::export]
pub fn teardown_library() {
    context::teardown();
}

/// Route log records to `callback`. Safe to call again to swap callbacks.
#[uniffi::export]
pub fn initialize_logging(callback: Box<dyn LogCallback>, max_level: FfiLogLevel) {
    let level = log::Level::from(max_level);
    // A second call finds the logger installed and only updates it
    let _ = init_ffi_logger(level);
    set_log_level(level);
    set_log_callback(Some(Arc::from(callback)));
}

#[uniffi::export]
pub fn set_logging_level(level: FfiLogLevel) {
    set_log_level(level.into());
}
