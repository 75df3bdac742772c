//! Contract policy knobs.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENV_SHELF_REQUIRES_APPROVAL: &str = "CIRCLES_SHELF_REQUIRES_APPROVAL";
pub const ENV_UNSHELVE_ON_EDIT: &str = "CIRCLES_UNSHELVE_ON_EDIT";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "CIRCLES_DEFAULT_PAGE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// `setProductOnShelf(true)` requires an approved audit.
    pub shelf_requires_approval: bool,
    /// `editProduct` also takes the product off the shelf.
    pub unshelve_on_edit: bool,
    pub default_page_size: usize,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            shelf_requires_approval: true,
            unshelve_on_edit: true,
            default_page_size: 10,
        }
    }
}

impl ContractConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; unset or unparseable values keep the
    /// default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            shelf_requires_approval: read(&lookup, ENV_SHELF_REQUIRES_APPROVAL, parse_flag)
                .unwrap_or(defaults.shelf_requires_approval),
            unshelve_on_edit: read(&lookup, ENV_UNSHELVE_ON_EDIT, parse_flag)
                .unwrap_or(defaults.unshelve_on_edit),
            default_page_size: read(&lookup, ENV_DEFAULT_PAGE_SIZE, |raw| {
                raw.parse::<usize>().ok().filter(|n| *n > 0)
            })
            .unwrap_or(defaults.default_page_size),
        }
    }
}

fn read<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(key, value = %raw, "ignoring unparseable config value");
    }
    parsed
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
