//! Error types for the Prism presentation foundation
//!
//! Construction-time failures (registration, type resolution, template
//! compilation) surface immediately to the caller. Runtime failures raised by
//! trigger actions are logged by the style system and never unwind the update
//! loop.

use std::collections::HashMap;
use thiserror::Error;

/// Context information for errors to aid in debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation that was being performed when the error occurred
    pub operation: String,
    /// Component or module where the error occurred
    pub component: String,
    /// Additional contextual data
    pub metadata: HashMap<String, String>,
    /// Template or element path, if available
    pub call_path: Option<String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            component: component.into(),
            metadata: HashMap::new(),
            call_path: None,
        }
    }

    /// Add metadata to the context
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add call path information
    pub fn with_call_path(mut self, path: impl Into<String>) -> Self {
        self.call_path = Some(path.into());
        self
    }

    /// Format context for logging
    pub fn format_for_log(&self) -> String {
        let mut parts = vec![
            format!("operation={}", self.operation),
            format!("component={}", self.component),
        ];

        if !self.metadata.is_empty() {
            let mut entries = self
                .metadata
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>();
            entries.sort();
            parts.push(format!("metadata=[{}]", entries.join(", ")));
        }

        if let Some(ref path) = self.call_path {
            parts.push(format!("call_path={}", path));
        }

        parts.join(", ")
    }
}

/// Main error type for Prism operations
#[derive(Debug, Error)]
pub enum PrismError {
    #[error("Duplicate registration: '{name}' is already registered on '{owner}'")]
    DuplicateRegistration {
        name: String,
        owner: String,
        context: Option<ErrorContext>,
    },

    #[error("Duplicate metadata override: '{property}' is already overridden on '{class}'")]
    DuplicateMetadataOverride {
        property: String,
        class: String,
        context: Option<ErrorContext>,
    },

    #[error("Property not found: '{name}' is not registered on '{owner}' or its ancestors")]
    PropertyNotFound {
        name: String,
        owner: String,
        context: Option<ErrorContext>,
    },

    #[error("Unknown type: '{type_name}'")]
    UnknownType {
        type_name: String,
        context: Option<ErrorContext>,
    },

    #[error("Invalid target: cannot set '{property}' on '{class}': {reason}")]
    InvalidTarget {
        property: String,
        class: String,
        reason: String,
        context: Option<ErrorContext>,
    },

    #[error("Type mismatch: '{property}' expects {expected}, got {actual}")]
    TypeMismatch {
        property: String,
        expected: String,
        actual: String,
        context: Option<ErrorContext>,
    },

    #[error("Element not found: {message}")]
    ElementNotFound {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Invalid operation: {message}")]
    InvalidOperation {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Template error: {message}")]
    Template {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Expression error: {message}")]
    Expression {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Content error: {message}")]
    Content {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Style sheet error: {message}")]
    StyleSheet {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrismError {
    /// Create a duplicate registration error
    pub fn duplicate_registration(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::DuplicateRegistration {
            name: name.into(),
            owner: owner.into(),
            context: None,
        }
    }

    /// Create a property-not-found error
    pub fn property_not_found(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            name: name.into(),
            owner: owner.into(),
            context: None,
        }
    }

    /// Create an unknown type error
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
            context: None,
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(
        property: impl Into<String>,
        class: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTarget {
            property: property.into(),
            class: class.into(),
            reason: reason.into(),
            context: None,
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        property: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            property: property.into(),
            expected: expected.into(),
            actual: actual.into(),
            context: None,
        }
    }

    /// Create an element-not-found error from a string
    pub fn element_not_found<S: Into<String>>(msg: S) -> Self {
        Self::ElementNotFound {
            message: msg.into(),
            context: None,
        }
    }

    /// Create an invalid operation error from a string
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        Self::InvalidOperation {
            message: msg.into(),
            context: None,
        }
    }

    /// Create a template error from a string
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template {
            message: msg.into(),
            context: None,
        }
    }

    /// Create an expression error from a string
    pub fn expression<S: Into<String>>(msg: S) -> Self {
        Self::Expression {
            message: msg.into(),
            context: None,
        }
    }

    /// Create a content error from a string
    pub fn content<S: Into<String>>(msg: S) -> Self {
        Self::Content {
            message: msg.into(),
            context: None,
        }
    }

    /// Create a style sheet error from a string
    pub fn style_sheet<S: Into<String>>(msg: S) -> Self {
        Self::StyleSheet {
            message: msg.into(),
            context: None,
        }
    }

    /// Create a configuration error from a string
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration {
            message: msg.into(),
            context: None,
        }
    }

    /// Attach context to an error. `Io` errors carry no context and are returned unchanged.
    pub fn with_context(mut self, new_context: ErrorContext) -> Self {
        match &mut self {
            Self::DuplicateRegistration { context, .. }
            | Self::DuplicateMetadataOverride { context, .. }
            | Self::PropertyNotFound { context, .. }
            | Self::UnknownType { context, .. }
            | Self::InvalidTarget { context, .. }
            | Self::TypeMismatch { context, .. }
            | Self::ElementNotFound { context, .. }
            | Self::InvalidOperation { context, .. }
            | Self::Template { context, .. }
            | Self::Expression { context, .. }
            | Self::Content { context, .. }
            | Self::StyleSheet { context, .. }
            | Self::Configuration { context, .. } => *context = Some(new_context),
            Self::Io(_) => {}
        }
        self
    }

    /// Get the error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::DuplicateRegistration { context, .. }
            | Self::DuplicateMetadataOverride { context, .. }
            | Self::PropertyNotFound { context, .. }
            | Self::UnknownType { context, .. }
            | Self::InvalidTarget { context, .. }
            | Self::TypeMismatch { context, .. }
            | Self::ElementNotFound { context, .. }
            | Self::InvalidOperation { context, .. }
            | Self::Template { context, .. }
            | Self::Expression { context, .. }
            | Self::Content { context, .. }
            | Self::StyleSheet { context, .. }
            | Self::Configuration { context, .. } => context.as_ref(),
            Self::Io(_) => None,
        }
    }

    /// Format error with context for logging
    pub fn format_for_log(&self) -> String {
        let base_msg = self.to_string();
        if let Some(context) = self.context() {
            format!("{} [{}]", base_msg, context.format_for_log())
        } else {
            base_msg
        }
    }
}

/// Result type alias for Prism operations
pub type Result<T> = std::result::Result<T, PrismError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_formatted_after_message() {
        let err = PrismError::unknown_type("Bogus").with_context(
            ErrorContext::new("instantiate", "uvml")
                .with_metadata("template", "MainView")
                .with_call_path("Grid/Bogus"),
        );

        assert_eq!(
            err.format_for_log(),
            "Unknown type: 'Bogus' [operation=instantiate, component=uvml, \
             metadata=[template=MainView], call_path=Grid/Bogus]"
        );
    }

    #[test]
    fn test_io_error_has_no_context() {
        let err: PrismError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        let err = err.with_context(ErrorContext::new("load", "content"));
        assert!(err.context().is_none());
    }
}
