//! UVML templates for the Prism presentation foundation
//!
//! Markup ([`UvmlElement`]) is compiled once into a [`UvmlTemplate`]: a graph of
//! [`InstantiateNode`]s whose [`Mutator`]s assign property values in declared
//! order. Templates are instantiated into an [`ElementTree`] against a
//! [`UvmlEnvironment`] holding the factory registry and the compiled-expression
//! source.
//!
//! [`ElementTree`]: prism_core::tree::ElementTree

pub mod compiler;
pub mod context;
pub mod expression;
pub mod factory;
pub mod markup;
pub mod mutator;
pub mod node;
pub mod template;

pub use compiler::UvmlCompiler;
pub use context::{UvmlEnvironment, UvmlInstantiationContext};
pub use expression::{BindingExpression, CompiledExpressionTable, ExpressionScope, ExpressionSource};
pub use factory::{FactoryEntry, FactoryRegistry};
pub use markup::{AttributeValue, UvmlElement};
pub use mutator::{
    ChildMutator, DependencyPropertyValueMutator, MutationOutcome, Mutator, StandardPropertyValueMutator,
};
pub use node::{InstantiateNode, UvmlNode};
pub use template::UvmlTemplate;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        compiler::UvmlCompiler,
        context::UvmlEnvironment,
        expression::{BindingExpression, CompiledExpressionTable},
        factory::FactoryRegistry,
        markup::UvmlElement,
        template::UvmlTemplate,
    };
}
