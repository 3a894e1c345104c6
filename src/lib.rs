//! Bank statement ingestion for Brazilian banks: detect the exporting bank,
//! parse CSV, Excel and PDF statements into normalized transactions, flag
//! duplicates and stage them in an import session for review.

pub mod banks;
pub mod cli;
pub mod db;
pub mod duplicates;
pub mod encoding;
pub mod error;
pub mod fmt;
pub mod formats;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod rows;
pub mod session;
pub mod settings;
pub mod store;

pub use error::{ExtratoError, Result};
pub use session::{ImportService, UploadedFile};
