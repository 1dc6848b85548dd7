use crate::error::{TransformError, TransformResult};
use kt_rigid_payloads::RigidTransform;
use std::collections::HashMap;

/// Ordered set of transforms with a name index.
///
/// Membership uses transform equality, so the same geometry under another
/// name or another frame pair is a different member. Names must be unique:
/// adding a transform whose name is already taken by a different transform
/// fails. The index is rebuilt on every insertion, which is fine at the scale
/// of a robot description.
#[derive(Debug, Clone, Default)]
pub struct RigidCollection {
    transforms: Vec<RigidTransform>,
    names: HashMap<String, usize>,
}

impl RigidCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transforms<I>(transforms: I) -> TransformResult<Self>
    where
        I: IntoIterator<Item = RigidTransform>,
    {
        let mut collection = Self::new();
        collection.add(transforms)?;
        Ok(collection)
    }

    /// Append every transform not already present and return how many were
    /// appended. Nothing is appended when any of them has a clashing name.
    pub fn add<I>(&mut self, transforms: I) -> TransformResult<usize>
    where
        I: IntoIterator<Item = RigidTransform>,
    {
        let mut pending: Vec<RigidTransform> = Vec::new();

        for transform in transforms {
            if self.transforms.contains(&transform) || pending.contains(&transform) {
                continue;
            }
            if let Some(name) = transform.name() {
                if self.names.contains_key(name) || pending.iter().any(|p| p.name() == Some(name))
                {
                    return Err(TransformError::DuplicateName(name.to_string()));
                }
            }
            pending.push(transform);
        }

        let added = pending.len();
        if added > 0 {
            self.transforms.extend(pending);
            self.rebuild_index();
        }
        Ok(added)
    }

    fn rebuild_index(&mut self) {
        self.names = self
            .transforms
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.name().map(|name| (name.to_string(), i)))
            .collect();
    }

    /// Find a transform by name.
    ///
    /// `Ok(None)` means the collection has no named transforms at all, so
    /// there is nothing a name could refer to.
    pub fn lookup(&self, name: &str) -> TransformResult<Option<&RigidTransform>> {
        if self.names.is_empty() {
            return Ok(None);
        }
        self.names
            .get(name)
            .map(|&i| Some(&self.transforms[i]))
            .ok_or_else(|| TransformError::NameNotFound(name.to_string()))
    }

    pub fn get(&self, index: usize) -> Option<&RigidTransform> {
        self.transforms.get(index)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RigidTransform> {
        self.transforms.iter()
    }
}

impl<'a> IntoIterator for &'a RigidCollection {
    type Item = &'a RigidTransform;
    type IntoIter = std::slice::Iter<'a, RigidTransform>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
