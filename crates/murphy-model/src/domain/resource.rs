use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Amount of compute a container offers or a task requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    memory_mb: u32,
    vcores: u32,
}

impl Resource {
    /// Create a resource capability; both dimensions must be positive.
    pub fn new(memory_mb: u32, vcores: u32) -> Result<Self, ModelError> {
        if memory_mb == 0 {
            return Err(ModelError::InvalidResource("memory must be positive".into()));
        }
        if vcores == 0 {
            return Err(ModelError::InvalidResource("vcores must be positive".into()));
        }
        Ok(Self { memory_mb, vcores })
    }

    pub fn memory_mb(&self) -> u32 {
        self.memory_mb
    }

    pub fn vcores(&self) -> u32 {
        self.vcores
    }

    /// Returns `true` if `self` fits entirely inside `other`.
    pub fn fits_in(&self, other: &Resource) -> bool {
        self.memory_mb <= other.memory_mb && self.vcores <= other.vcores
    }

    /// Subtract `other`, returning `None` if it does not fit.
    ///
    /// The result may be zero in either dimension, which [`Resource::new`] would reject;
    /// it is meant for capacity accounting only.
    pub fn checked_sub(&self, other: &Resource) -> Option<Resource> {
        Some(Resource {
            memory_mb: self.memory_mb.checked_sub(other.memory_mb)?,
            vcores: self.vcores.checked_sub(other.vcores)?,
        })
    }

    pub fn saturating_add(&self, other: &Resource) -> Resource {
        Resource {
            memory_mb: self.memory_mb.saturating_add(other.memory_mb),
            vcores: self.vcores.saturating_add(other.vcores),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<memory:{}MB, vcores:{}>", self.memory_mb, self.vcores)
    }
}
