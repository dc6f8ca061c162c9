//! Sensitive-data masking for request logs.
//!
//! | Module          | Job                                                        |
//! |-----------------|------------------------------------------------------------|
//! | `dotted_path`   | mask one `a.b.c` path inside a JSON document               |
//! | `registry`      | build the per-request [`SensitiveFieldSpec`]               |
//! | `engine`        | mask headers, cookies, bodies and query strings            |
//! | `route_filter`  | glob blacklist of paths that are never logged              |
//! | `truncate`      | cut bodies to a configured number of characters            |
//!
//! # Usage
//!
//! ```
//! use reqlog_core::config::SensitiveDefaults;
//! use reqlog_masking::{MASK_TOKEN, MaskingEngine, SensitiveFieldRegistry};
//! use std::collections::BTreeMap;
//!
//! let registry = SensitiveFieldRegistry::new(&SensitiveDefaults::default());
//! let mut signals = BTreeMap::new();
//! signals.insert(
//!     "x-sensitive-request-body-json".to_string(),
//!     vec![r#"["password"]"#.to_string()],
//! );
//! let spec = registry.build(&signals);
//!
//! let engine = MaskingEngine::new(&spec);
//! let body = engine.mask_body(r#"{"password":"hunter2","user":"bob"}"#).unwrap();
//! assert_eq!(body, format!(r#"{{"password":"{MASK_TOKEN}","user":"bob"}}"#));
//! ```

pub mod dotted_path;
pub mod engine;
pub mod registry;
pub mod route_filter;
pub mod truncate;

pub use engine::MaskingEngine;
pub use registry::{SensitiveFieldRegistry, SensitiveFieldSpec};
pub use route_filter::RouteFilter;
pub use truncate::{EMPTY_BODY, truncate};

/// Replacement string used for all masked values.
pub const MASK_TOKEN: &str = "[ MASKED ]";
