// SPDX-License-Identifier: GPL-3.0-only
pub mod path_sanitizer;
pub mod persist;
pub mod url_validator;

pub use path_sanitizer::{app_dir_name, validate_path_within_base};
pub use persist::{from_keyed_json, to_keyed_json, write_atomically};
pub use url_validator::validate_url;
