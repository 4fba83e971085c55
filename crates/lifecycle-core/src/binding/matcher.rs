use std::fmt;
use std::sync::Arc;

use crate::stager::type_mapper::TypeDescriptor;

/// Filter deciding which provisioned types a binding applies to
#[derive(Clone, Default)]
pub enum TypeMatcher {
    #[default]
    Any,
    Exactly(TypeDescriptor),
    OneOf(Vec<TypeDescriptor>),
    Predicate(Arc<dyn Fn(&TypeDescriptor) -> bool + Send + Sync>),
}

impl TypeMatcher {
    pub fn exactly<T: ?Sized + 'static>() -> Self {
        TypeMatcher::Exactly(TypeDescriptor::of::<T>())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        TypeMatcher::Predicate(Arc::new(f))
    }

    pub fn matches(&self, ty: &TypeDescriptor) -> bool {
        match self {
            TypeMatcher::Any => true,
            TypeMatcher::Exactly(expected) => expected.id() == ty.id(),
            TypeMatcher::OneOf(types) => types.iter().any(|t| t.id() == ty.id()),
            TypeMatcher::Predicate(f) => f(ty),
        }
    }
}

impl fmt::Debug for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeMatcher::Any => write!(f, "Any"),
            TypeMatcher::Exactly(ty) => write!(f, "Exactly({})", ty),
            TypeMatcher::OneOf(types) => f.debug_tuple("OneOf").field(types).finish(),
            TypeMatcher::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}
