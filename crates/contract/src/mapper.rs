//! The object mapping capability a contract is built on.
//!
//! A [`Mapper`] turns a borrowed value of one type into a new value of another type. The pipeline
//! uses it twice per invocation: request into domain input, and domain output into response.
//!
//! [`MapperRegistry`] is a hand-written implementation keyed by the `(source, target)` type pair,
//! which is enough for most applications and for tests. Anything smarter (reflection, naming
//! conventions) can be plugged in by implementing [`Mapper`].

use crate::error::{BoxError, MapError};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Maps a value of type `S` into a new value of type `T`.
///
/// Implementations are shared by every pipeline built from a contract and are called from many
/// concurrent invocations, hence the `Send + Sync` bound.
pub trait Mapper: Send + Sync {
    /// Produce a `T` from `source`, or fail if no transformation exists for the pair.
    fn map<S, T>(&self, source: &S) -> Result<T, MapError>
    where
        S: 'static,
        T: 'static;
}

impl<M: Mapper> Mapper for Arc<M> {
    #[inline]
    fn map<S, T>(&self, source: &S) -> Result<T, MapError>
    where
        S: 'static,
        T: 'static,
    {
        (**self).map(source)
    }
}

type MapFn = Box<dyn Fn(&dyn Any) -> Result<Box<dyn Any>, MapError> + Send + Sync>;

/// A [`Mapper`] backed by explicitly registered conversion functions.
pub struct MapperRegistry {
    maps: HashMap<(TypeId, TypeId), MapFn>,
}

impl MapperRegistry {
    pub fn builder() -> MapperRegistryBuilder {
        MapperRegistryBuilder::new()
    }

    /// Returns true if a mapping from `S` to `T` is registered
    pub fn contains<S: 'static, T: 'static>(&self) -> bool {
        self.maps.contains_key(&key::<S, T>())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

impl Mapper for MapperRegistry {
    fn map<S, T>(&self, source: &S) -> Result<T, MapError>
    where
        S: 'static,
        T: 'static,
    {
        let Some(map_fn) = self.maps.get(&key::<S, T>()) else {
            return Err(MapError::unmapped::<S, T>());
        };

        let source: &dyn Any = source;
        let target = map_fn(source)?;
        target.downcast::<T>().map(|target| *target).map_err(|_target| MapError::type_mismatch::<S, T>())
    }
}

impl fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperRegistry").field("mappings", &self.maps.len()).finish()
    }
}

pub struct MapperRegistryBuilder {
    maps: HashMap<(TypeId, TypeId), MapFn>,
}

impl MapperRegistryBuilder {
    fn new() -> Self {
        Self { maps: HashMap::new() }
    }

    /// Register an infallible mapping from `S` to `T`, replacing any previous one
    pub fn register<S, T, F>(self, f: F) -> Self
    where
        S: 'static,
        T: 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.try_register(move |source: &S| Ok::<T, BoxError>(f(source)))
    }

    /// Register a mapping from `S` to `T` that may reject its input
    pub fn try_register<S, T, E, F>(mut self, f: F) -> Self
    where
        S: 'static,
        T: 'static,
        E: Into<BoxError>,
        F: Fn(&S) -> Result<T, E> + Send + Sync + 'static,
    {
        let map_fn: MapFn = Box::new(move |source: &dyn Any| {
            let source = source.downcast_ref::<S>().ok_or_else(MapError::type_mismatch::<S, T>)?;
            let target = f(source).map_err(MapError::failed::<S, T, E>)?;
            Ok(Box::new(target) as Box<dyn Any>)
        });

        if self.maps.insert(key::<S, T>(), map_fn).is_some() {
            warn!(source = type_name::<S>(), target = type_name::<T>(), "mapping registered twice, keeping the last one");
        }
        self
    }

    pub fn build(self) -> MapperRegistry {
        MapperRegistry { maps: self.maps }
    }
}

impl fmt::Debug for MapperRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperRegistryBuilder").field("mappings", &self.maps.len()).finish()
    }
}

#[inline]
fn key<S: 'static, T: 'static>() -> (TypeId, TypeId) {
    (TypeId::of::<S>(), TypeId::of::<T>())
}
