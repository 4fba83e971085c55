use std::any::{TypeId, type_name};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use parking_lot::RwLock;

use crate::stager::RegistrationId;

/// Runtime description of a Rust type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Records which declaring type contributed each registration.
///
/// Purely diagnostic: a mapper never influences ordering or outcomes.
pub trait StageableTypeMapper: Send + Sync {
    fn register_type(&self, stage: &str, id: RegistrationId, declaring_type: TypeDescriptor);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpStageableTypeMapper;

impl StageableTypeMapper for NoOpStageableTypeMapper {
    fn register_type(&self, _stage: &str, _id: RegistrationId, _declaring_type: TypeDescriptor) {}
}

/// In-memory mapper answering "which types contributed to this stage".
#[derive(Debug, Default)]
pub struct DefaultStageableTypeMapper {
    types: RwLock<BTreeMap<(String, RegistrationId), TypeDescriptor>>,
}

impl DefaultStageableTypeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_of(&self, stage: &str, id: RegistrationId) -> Option<TypeDescriptor> {
        self.types.read().get(&(stage.to_string(), id)).copied()
    }

    /// Distinct declaring types of one stage, in registration order
    pub fn declaring_types(&self, stage: &str) -> Vec<TypeDescriptor> {
        let types = self.types.read();
        let mut seen = HashSet::new();
        let mut declaring = Vec::new();
        for ((s, _), ty) in types.iter() {
            if s == stage && seen.insert(ty.id()) {
                declaring.push(*ty);
            }
        }
        declaring
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl StageableTypeMapper for DefaultStageableTypeMapper {
    fn register_type(&self, stage: &str, id: RegistrationId, declaring_type: TypeDescriptor) {
        log::debug!("Stage '{}': registration {} declared by {}", stage, id, declaring_type);
        self.types.write().insert((stage.to_string(), id), declaring_type);
    }
}
