//! Content manager and view interfaces
//!
//! Asset loading is owned by the host application. The presentation layer only
//! asks a [`ContentManager`] for already-imported assets, picking the global or
//! the view-local manager according to the asset's source tag.

use crate::error::{PrismError, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Screen density used to select density-specific asset variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScreenDensityBucket {
    #[default]
    Desktop,
    Low,
    Medium,
    High,
    ExtraHigh,
    ExtraExtraHigh,
    ExtraExtraExtraHigh,
}

/// Which content manager an asset is loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AssetSource {
    #[default]
    Global,
    Local,
}

/// Asset identifier tagged with its source, written `"Sounds/Click global"`.
/// A missing tag means global.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcedAsset {
    pub asset: String,
    pub source: AssetSource,
}

impl SourcedAsset {
    pub fn global(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            source: AssetSource::Global,
        }
    }

    pub fn local(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            source: AssetSource::Local,
        }
    }
}

impl FromStr for SourcedAsset {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PrismError::content("Empty asset identifier"));
        }

        let (asset, source) = match s.rsplit_once(char::is_whitespace) {
            Some((asset, tag)) => match tag.to_ascii_lowercase().as_str() {
                "global" => (asset.trim(), AssetSource::Global),
                "local" => (asset.trim(), AssetSource::Local),
                other => {
                    return Err(PrismError::content(format!(
                        "Unknown asset source '{}' in '{}'",
                        other, s
                    )))
                }
            },
            None => (s, AssetSource::Global),
        };

        Ok(Self {
            asset: asset.to_string(),
            source,
        })
    }
}

impl fmt::Display for SourcedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.source {
            AssetSource::Global => "global",
            AssetSource::Local => "local",
        };
        write!(f, "{} {}", self.asset, tag)
    }
}

/// Asset loader supplied by the host application
pub trait ContentManager: Send + Sync {
    /// Load an asset. The returned value is downcast by [`load`].
    fn load_asset(
        &self,
        asset: &str,
        density: ScreenDensityBucket,
    ) -> anyhow::Result<Arc<dyn Any + Send + Sync>>;
}

/// Load an asset of type `T` from `content`
pub fn load<T>(content: &dyn ContentManager, asset: &str, density: ScreenDensityBucket) -> Result<T>
where
    T: Any + Clone,
{
    let loaded = content.load_asset(asset, density).map_err(|e| {
        PrismError::content(format!("Failed to load '{}': {:#}", asset, e))
    })?;

    loaded.downcast_ref::<T>().cloned().ok_or_else(|| {
        PrismError::content(format!(
            "Asset '{}' is not a {}",
            asset,
            std::any::type_name::<T>()
        ))
    })
}

/// Resources of the view an element tree is presented in
#[derive(Clone, Default)]
pub struct PresentationView {
    pub global_content: Option<Arc<dyn ContentManager>>,
    pub local_content: Option<Arc<dyn ContentManager>>,
    pub density: ScreenDensityBucket,
}

impl PresentationView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global_content(mut self, content: Arc<dyn ContentManager>) -> Self {
        self.global_content = Some(content);
        self
    }

    pub fn with_local_content(mut self, content: Arc<dyn ContentManager>) -> Self {
        self.local_content = Some(content);
        self
    }

    pub fn with_density(mut self, density: ScreenDensityBucket) -> Self {
        self.density = density;
        self
    }

    /// Content manager serving `source`, if the view has one
    pub fn content_for(&self, source: AssetSource) -> Option<&Arc<dyn ContentManager>> {
        match source {
            AssetSource::Global => self.global_content.as_ref(),
            AssetSource::Local => self.local_content.as_ref(),
        }
    }
}

impl fmt::Debug for PresentationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationView")
            .field("global_content", &self.global_content.is_some())
            .field("local_content", &self.local_content.is_some())
            .field("density", &self.density)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Numbers;

    impl ContentManager for Numbers {
        fn load_asset(
            &self,
            asset: &str,
            _density: ScreenDensityBucket,
        ) -> anyhow::Result<Arc<dyn Any + Send + Sync>> {
            match asset {
                "one" => Ok(Arc::new(1u32)),
                _ => anyhow::bail!("no such asset"),
            }
        }
    }

    #[test]
    fn test_sourced_asset_parsing() {
        let asset: SourcedAsset = "Sounds/Click local".parse().unwrap();
        assert_eq!(asset, SourcedAsset::local("Sounds/Click"));

        let asset: SourcedAsset = "Sounds/Click".parse().unwrap();
        assert_eq!(asset.source, AssetSource::Global);
        assert_eq!(asset.to_string(), "Sounds/Click global");

        assert!("Sounds/Click remote".parse::<SourcedAsset>().is_err());
        assert!("  ".parse::<SourcedAsset>().is_err());
    }

    #[test]
    fn test_typed_load() {
        let content = Numbers;
        assert_eq!(load::<u32>(&content, "one", ScreenDensityBucket::Desktop).unwrap(), 1);
        assert!(matches!(
            load::<String>(&content, "one", ScreenDensityBucket::Desktop),
            Err(PrismError::Content { .. })
        ));
        assert!(load::<u32>(&content, "two", ScreenDensityBucket::Desktop).is_err());
    }
}
