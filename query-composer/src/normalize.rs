//! Turns arbitrary host values into canonical [`Value`] trees.
use serde::Serialize;

use crate::config::NormalizationLimits;
use crate::error::NormalizeError;
use crate::value::Value;
use crate::value::ser::ValueSerializer;

pub(crate) const DEFAULT_MAX_DEPTH: usize = 512;

/// Normalizes host values with a bounded nesting depth.
///
/// Any `T: Serialize` is a host value: wrappers (`Option`, `Box`, `Rc`, newtypes) are looked
/// through, structs and maps become [`Mapping`](crate::Mapping)s, other containers become
/// sequences and primitives pass through as scalars. Only what a type chooses to serialize is
/// ever visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    max_depth: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Normalizer {
    pub fn new(limits: &NormalizationLimits) -> Self {
        Self {
            max_depth: limits.max_depth,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn normalize<T>(&self, value: &T) -> Result<Value, NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(ValueSerializer::new(self.max_depth))
    }
}

/// Normalizes `value` with the default depth limit.
pub fn normalize<T>(value: &T) -> Result<Value, NormalizeError>
where
    T: ?Sized + Serialize,
{
    Normalizer::default().normalize(value)
}
