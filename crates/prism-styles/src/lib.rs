//! UVSS styling for the Prism presentation foundation
//!
//! Parsed [`UvssDocument`]s are combined into a [`CompositeUvssDocument`]
//! which writes setter values into the Styled layer of matching elements and
//! drives the [`Trigger`] state machines of their rules. The application-wide
//! sheet is a [`GlobalStyleSheet`] installed through a [`StyleSheetHost`].

pub mod action;
pub mod composite;
pub mod document;
pub mod global;
pub mod selector;
pub mod trigger;

pub use action::{
    PlaySoundTriggerAction, SetTriggeredValueTriggerAction, SoundEffect, TriggerAction,
    TriggerActionCollection,
};
pub use composite::CompositeUvssDocument;
pub use document::{UvssDocument, UvssRule, UvssSetter};
pub use global::{GlobalStyleSheet, StyleSheetHost, UiStyleHost};
pub use selector::{SelectorPart, Specificity, UvssSelector};
pub use trigger::{Trigger, TriggerComparison, TriggerCondition, TriggerState, TriggerTransition};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        action::{PlaySoundTriggerAction, SetTriggeredValueTriggerAction, TriggerAction},
        composite::CompositeUvssDocument,
        document::{UvssDocument, UvssRule},
        global::{GlobalStyleSheet, UiStyleHost},
        selector::UvssSelector,
        trigger::{Trigger, TriggerComparison},
    };
}
