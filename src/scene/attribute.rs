use std::collections::HashMap;

use crate::error::{RigError, RigResult};
use crate::expr::{Value, ValueType};
use crate::id::{AttrId, NodeId};

/// Schema of one named attribute: type, optional numeric range, default.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub value_type: ValueType,
    pub range: Option<(f32, f32)>,
    pub default: Value,
}

impl AttributeSpec {
    pub fn float(name: impl Into<String>, default: f32) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Float,
            range: None,
            default: Value::Float(default),
        }
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Bool,
            range: None,
            default: Value::Bool(default),
        }
    }

    pub fn vec3(name: impl Into<String>, default: glam::Vec3) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Vec3,
            range: None,
            default: Value::Vec3(default),
        }
    }

    /// Choice among `count` options, stored as an index.
    pub fn enumeration(name: impl Into<String>, default: u32, count: u32) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Enum,
            range: Some((0.0, count.saturating_sub(1) as f32)),
            default: Value::Enum(default),
        }
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn with_min(self, min: f32) -> Self {
        self.with_range(min, f32::INFINITY)
    }

    pub fn clamp(&self, value: Value) -> Value {
        let Some((min, max)) = self.range else {
            return value;
        };
        match value {
            Value::Float(f) => Value::Float(f.clamp(min, max)),
            Value::Enum(e) => Value::Enum((e as f32).clamp(min, max) as u32),
            other => other,
        }
    }

    fn validate(&self) -> RigResult<()> {
        if self.default.value_type() != self.value_type {
            return Err(RigError::mismatch(
                format!("default of `{}`", self.name),
                self.value_type,
                self.default.value_type(),
            ));
        }
        if let Some((min, max)) = self.range {
            if !(min <= max) {
                return Err(RigError::invalid(
                    format!("attribute `{}`", self.name),
                    format!("empty range [{min}, {max}]"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub owner: NodeId,
    pub spec: AttributeSpec,
    pub value: Value,
}

/// Typed attribute schema per node, resolved once at build time.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    attributes: Vec<Attribute>,
    index: HashMap<(NodeId, String), AttrId>,
}

impl AttributeRegistry {
    /// Defines `spec` on `owner`. Defining the same spec twice returns the
    /// existing handle; redefining a name with a different schema fails.
    pub(crate) fn define(&mut self, owner: NodeId, spec: AttributeSpec) -> RigResult<AttrId> {
        spec.validate()?;
        if let Some(id) = self.lookup(owner, &spec.name) {
            let existing = &self.attributes[id.index()].spec;
            if existing.value_type != spec.value_type {
                return Err(RigError::mismatch(
                    format!("attribute `{}`", spec.name),
                    existing.value_type,
                    spec.value_type,
                ));
            }
            if *existing != spec {
                return Err(RigError::invalid(
                    format!("attribute `{}`", spec.name),
                    "already defined with a different range or default",
                ));
            }
            return Ok(id);
        }

        let id = AttrId::from_index(self.attributes.len());
        let value = spec.clamp(spec.default);
        self.index.insert((owner, spec.name.clone()), id);
        self.attributes.push(Attribute { owner, spec, value });
        Ok(id)
    }

    pub fn get(&self, id: AttrId) -> Option<&Attribute> {
        self.attributes.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: AttrId) -> Option<&mut Attribute> {
        self.attributes.get_mut(id.index())
    }

    pub fn lookup(&self, owner: NodeId, name: &str) -> Option<AttrId> {
        self.index.get(&(owner, name.to_string())).copied()
    }

    pub fn on(&self, owner: NodeId) -> impl Iterator<Item = (AttrId, &Attribute)> + '_ {
        self.attributes
            .iter()
            .enumerate()
            .filter(move |(_, a)| a.owner == owner)
            .map(|(i, a)| (AttrId::from_index(i), a))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defining_twice_is_idempotent() {
        let mut registry = AttributeRegistry::default();
        let spec = AttributeSpec::float("stretch", 1.0).with_range(0.0, 1.0);
        let first = registry.define(NodeId(0), spec.clone()).unwrap();
        let second = registry.define(NodeId(0), spec).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn redefining_with_another_type_fails() {
        let mut registry = AttributeRegistry::default();
        registry
            .define(NodeId(0), AttributeSpec::float("fk_ik", 0.0))
            .unwrap();
        let err = registry
            .define(NodeId(0), AttributeSpec::boolean("fk_ik", false))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeTypeMismatch);
    }

    #[test]
    fn attributes_are_found_per_owner() {
        let mut registry = AttributeRegistry::default();
        let stretch = registry
            .define(NodeId(0), AttributeSpec::float("stretch", 1.0))
            .unwrap();
        registry
            .define(NodeId(1), AttributeSpec::float("stretch", 0.0))
            .unwrap();
        let squash = registry
            .define(NodeId(0), AttributeSpec::float("squash", 0.0))
            .unwrap();

        assert_eq!(registry.lookup(NodeId(0), "stretch"), Some(stretch));
        assert_eq!(registry.lookup(NodeId(2), "stretch"), None);
        let owned: Vec<AttrId> = registry.on(NodeId(0)).map(|(id, _)| id).collect();
        assert_eq!(owned, vec![stretch, squash]);
    }

    #[test]
    fn range_clamps_values() {
        let spec = AttributeSpec::float("softIK", 0.0).with_range(0.0, 100.0);
        assert_eq!(spec.clamp(Value::Float(150.0)), Value::Float(100.0));
        assert_eq!(spec.clamp(Value::Float(-1.0)), Value::Float(0.0));
    }
}
