pub mod config;
pub mod cookie;
pub mod error;
pub mod record;

pub use config::RequestLogConfig;
pub use cookie::ResponseCookie;
pub use error::{ReqlogError, ReqlogResult};
pub use record::{RequestLogRecord, ResponseException};
