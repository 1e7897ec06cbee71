//! Global style sheet
//!
//! Documents are appended one at a time. Each append publishes a new immutable
//! composite snapshot and offers it to the UI subsystem. A rejected sheet is
//! forced in when `retry_failed_validation` is on, so a broken style sheet
//! degrades visuals instead of stopping startup.

use crate::composite::CompositeUvssDocument;
use crate::document::UvssDocument;
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;
use prism_core::config::{get_config_manager, StylingConfig};
use prism_core::content::{load, ContentManager, ScreenDensityBucket};
use prism_core::error::Result;
use prism_core::logging::LogCategory;
use prism_core::{prism_info, prism_warn};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SHEET_ID: AtomicU64 = AtomicU64::new(1);

/// The part of the UI subsystem that owns the active global style sheet
pub trait StyleSheetHost: Send + Sync {
    /// Install `sheet` if it is compatible with the active one
    fn try_install_global_style_sheet(&self, sheet: Arc<CompositeUvssDocument>) -> bool;

    /// Install `sheet` unconditionally
    fn set_global_style_sheet(&self, sheet: Arc<CompositeUvssDocument>);

    fn global_style_sheet(&self) -> Option<Arc<CompositeUvssDocument>>;
}

/// Decides whether `candidate` may replace `current`
pub type CompatibilityPolicy =
    Arc<dyn Fn(Option<&CompositeUvssDocument>, &CompositeUvssDocument) -> bool + Send + Sync>;

/// Default [`StyleSheetHost`]: a swappable slot plus a compatibility policy.
///
/// Without a custom policy a sheet is compatible when the slot is empty or
/// holds an earlier snapshot of the same global style sheet.
pub struct UiStyleHost {
    slot: ArcSwapOption<CompositeUvssDocument>,
    policy: CompatibilityPolicy,
}

impl UiStyleHost {
    pub fn new() -> Self {
        Self::with_policy(|current, candidate| {
            current.map_or(true, |current| current.origin() == candidate.origin())
        })
    }

    pub fn with_policy<F>(policy: F) -> Self
    where
        F: Fn(Option<&CompositeUvssDocument>, &CompositeUvssDocument) -> bool + Send + Sync + 'static,
    {
        Self {
            slot: ArcSwapOption::empty(),
            policy: Arc::new(policy),
        }
    }
}

impl Default for UiStyleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleSheetHost for UiStyleHost {
    fn try_install_global_style_sheet(&self, sheet: Arc<CompositeUvssDocument>) -> bool {
        let current = self.slot.load();
        if !(self.policy)(current.as_deref(), &sheet) {
            return false;
        }
        self.slot.store(Some(sheet));
        true
    }

    fn set_global_style_sheet(&self, sheet: Arc<CompositeUvssDocument>) {
        self.slot.store(Some(sheet));
    }

    fn global_style_sheet(&self) -> Option<Arc<CompositeUvssDocument>> {
        self.slot.load_full()
    }
}

impl fmt::Debug for UiStyleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiStyleHost")
            .field("origin", &self.slot.load_full().and_then(|s| s.origin()))
            .finish()
    }
}

/// Application-wide style sheet built from appended documents
pub struct GlobalStyleSheet {
    id: u64,
    sources: Mutex<Vec<Arc<UvssDocument>>>,
    current: ArcSwap<CompositeUvssDocument>,
    host: Arc<dyn StyleSheetHost>,
    config: StylingConfig,
}

impl GlobalStyleSheet {
    pub fn new(host: Arc<dyn StyleSheetHost>) -> Self {
        let config = get_config_manager()
            .map(|manager| manager.get_styling_config())
            .unwrap_or_default();
        Self::with_config(host, config)
    }

    pub fn with_config(host: Arc<dyn StyleSheetHost>, config: StylingConfig) -> Self {
        let id = NEXT_SHEET_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            sources: Mutex::new(Vec::new()),
            current: ArcSwap::from_pointee(CompositeUvssDocument::with_origin(id)),
            host,
            config,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current snapshot
    pub fn composite(&self) -> Arc<CompositeUvssDocument> {
        self.current.load_full()
    }

    pub fn host(&self) -> &Arc<dyn StyleSheetHost> {
        &self.host
    }

    /// Load a document from `content` and append it. Returns whether the UI
    /// subsystem accepted the sheet without the fallback.
    pub fn append(&self, content: &dyn ContentManager, asset_path: &str) -> Result<bool> {
        let document = load::<Arc<UvssDocument>>(content, asset_path, ScreenDensityBucket::default())?;
        prism_info!(
            LogCategory::Styles,
            "Appending style sheet '{}' ({} rules)",
            asset_path,
            document.len()
        );
        Ok(self.append_shared(document))
    }

    /// Append an already parsed document
    pub fn append_document(&self, document: UvssDocument) -> bool {
        self.append_shared(Arc::new(document))
    }

    pub fn append_shared(&self, document: Arc<UvssDocument>) -> bool {
        {
            let mut sources = self.sources.lock();
            sources.push(document);

            let mut composite = CompositeUvssDocument::with_origin(self.id);
            for source in sources.iter() {
                composite.push(Arc::clone(source));
            }
            tracing::debug!(sheet = self.id, sources = sources.len(), "Published style sheet snapshot");
            self.current.store(Arc::new(composite));
        }

        let validated = self.on_validating();
        self.on_validation_complete(validated);
        validated
    }

    /// Offer the current snapshot to the UI subsystem
    pub fn on_validating(&self) -> bool {
        self.host.try_install_global_style_sheet(self.composite())
    }

    pub fn on_validation_complete(&self, validated: bool) {
        if validated {
            return;
        }
        if self.config.retry_failed_validation {
            prism_warn!(
                LogCategory::Styles,
                "Global style sheet {} failed validation, installing anyway",
                self.id
            );
            self.host.set_global_style_sheet(self.composite());
        } else {
            prism_warn!(
                LogCategory::Styles,
                "Global style sheet {} failed validation and was not installed",
                self.id
            );
        }
    }
}

impl fmt::Debug for GlobalStyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalStyleSheet")
            .field("id", &self.id)
            .field("sources", &self.sources.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshots_of_the_same_sheet_are_compatible() {
        let host = Arc::new(UiStyleHost::new());
        let sheet = GlobalStyleSheet::with_config(host.clone(), StylingConfig::default());

        assert!(sheet.append_document(UvssDocument::new()));
        assert!(sheet.append_document(UvssDocument::new()));
        let installed = host.global_style_sheet().unwrap();
        assert_eq!(installed.origin(), Some(sheet.id()));
        assert_eq!(installed.sources().len(), 2);

        let other = GlobalStyleSheet::with_config(
            host.clone(),
            StylingConfig {
                retry_failed_validation: false,
            },
        );
        assert!(!other.append_document(UvssDocument::new()));
        assert_eq!(host.global_style_sheet().unwrap().origin(), Some(sheet.id()));
    }
}
