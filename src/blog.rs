//! The blog's interactive elements, expressed as one page configuration.

use crate::config::PageConfig;
use crate::error::DispatchError;

pub const BLOG_CONFIG: &str = include_str!("../config/blog.json");

pub fn blog_config() -> Result<PageConfig, DispatchError> {
    PageConfig::from_json(BLOG_CONFIG)
}
