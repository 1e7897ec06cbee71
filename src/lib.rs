//! Prism - dependency properties, UVML templates and UVSS styling
//!
//! Prism is the property and templating core of a retained-mode presentation
//! foundation. Elements live in an [`ElementTree`](prism_core::ElementTree) and
//! carry layered dependency-property values. UVML templates build element
//! subtrees and UVSS style sheets style them.

pub use prism_core;
pub use prism_styles;
pub use prism_uvml;

pub use prism_core::config::{init_config, init_config_with, PrismConfig};

use prism_core::Result;

/// Unified prelude module that exports all commonly used types
pub mod prelude {
    pub use prism_core::prelude::*;
    pub use prism_styles::prelude::*;
    pub use prism_uvml::prelude::*;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the global configuration (defaults unless already set) and logging.
///
/// ```rust
/// fn main() -> prism_sdk::prism_core::Result<()> {
///     prism_sdk::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    init_config();
    prism_core::init()?;
    tracing::info!("Prism SDK v{} initialized", VERSION);
    Ok(())
}

/// Like [`init`], with an explicit configuration. Has no effect on the
/// configuration if one was already installed.
pub fn init_with(config: PrismConfig) -> Result<()> {
    init_config_with(config);
    init()
}
