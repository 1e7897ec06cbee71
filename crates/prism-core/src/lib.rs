//! Core functionality for the Prism presentation foundation
//!
//! This crate provides the dependency property system: the class table,
//! property registration and metadata, layered value storage with inheritance,
//! and the element tree the UVML and style crates operate on.

pub mod class;
pub mod config;
pub mod content;
pub mod element;
pub mod error;
pub mod logging;
pub mod property;
pub mod tree;
pub mod types;
pub mod value;

pub use class::{ClassId, ClassInfo, ClassKind, ClassRegistry, StandardProperty};
pub use config::{InvalidTargetPolicy, PrismConfig};
pub use content::{AssetSource, ContentManager, PresentationView, ScreenDensityBucket, SourcedAsset};
pub use element::{Element, ElementId, InvalidationFlags, TriggerSource, ValueLayer, ValueSource};
pub use error::{ErrorContext, PrismError, Result};
pub use logging::{LogCategory, LogLevel};
pub use property::{
    PropertyChange, PropertyDefinition, PropertyFlags, PropertyId, PropertyMetadata, PropertyRegistry,
};
pub use tree::ElementTree;
pub use types::Color;
pub use value::{Culture, PropertyValue, SharedObject, Value, ValueKind};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        class::{ClassId, ClassKind},
        element::{ElementId, TriggerSource, ValueLayer, ValueSource},
        error::{PrismError, Result},
        logging::{LogCategory, LogLevel},
        property::{PropertyFlags, PropertyId, PropertyMetadata, PropertyRegistry},
        tree::ElementTree,
        types::Color,
        value::{Culture, Value, ValueKind},
    };
}

/// Framework version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from the global configuration (or defaults)
pub fn init() -> Result<()> {
    let config = config::get_config_manager()
        .map(|manager| manager.get_logging_config())
        .unwrap_or_default();
    logging::init(&config)?;

    tracing::info!("Prism Core v{} initialized", VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
