//! Lens module
//!
//! Lenses combine business logic with output formatting so the same operation
//! can be driven from the CLI or used as a library.
//!
//! | Lens | Feature Required | Dependencies |
//! |------|-----------------|--------------|
//! | `AllowlistLens` | `lens-core` | ureq, regex, ipnet, oneio |
//!
//! Each lens module exports a **Lens struct** as the entry point, **Args
//! structs** for its inputs and the **output types** it returns.
//!
//! ```rust,ignore
//! use nginx_ipfilter::lens::allowlist::{AllowlistLens, AllowlistPreviewArgs};
//! use nginx_ipfilter::lens::utils::OutputFormat;
//! ```

pub mod utils;

// AllowlistLens - fetch feeds and write the nginx allow-list
pub mod allowlist;
