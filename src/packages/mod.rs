//! Bundled packages.

pub mod cancel;

use crate::base;
use crate::configuration::ConfigurationRegistry;

/// A registry holding every bundled package, ready for [`configure`] and
/// dynamic `\require` loading.
///
/// [`configure`]: crate::configuration::configure
#[must_use]
pub fn default_registry() -> ConfigurationRegistry {
    let mut registry = ConfigurationRegistry::default();
    registry.register(base::config());
    registry.register(cancel::config());
    registry
}
