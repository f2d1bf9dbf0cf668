//! Statically declared type descriptors.
//!
//! A [`TypeDescriptor`] says two things about a record kind: that the
//! rewriter may descend into it at all, and which of its fields hold stored
//! references in the legacy `bucket/object` form. Records of a kind that has
//! no registered descriptor are passed through untouched.

use std::collections::HashMap;

/// Metadata for a reference-bearing field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceField {
    default_bucket: Option<String>,
}

impl ReferenceField {
    /// A reference field whose values name both bucket and object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A reference field whose bare values are object names in `bucket`.
    pub fn in_bucket(bucket: impl Into<String>) -> Self {
        Self {
            default_bucket: Some(bucket.into()),
        }
    }

    /// Bucket assumed for values without one.
    #[must_use]
    pub fn default_bucket(&self) -> Option<&str> {
        self.default_bucket.as_deref()
    }
}

/// Rewriting metadata for one record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    kind: String,
    references: HashMap<String, ReferenceField>,
}

impl TypeDescriptor {
    /// A descriptor for `kind` with no reference fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            references: HashMap::new(),
        }
    }

    /// Mark `field` as holding `bucket/object` references.
    #[must_use]
    pub fn reference_field(mut self, field: impl Into<String>) -> Self {
        self.references.insert(field.into(), ReferenceField::new());
        self
    }

    /// Mark `field` as holding object names in `bucket` (or full
    /// `bucket/object` references).
    #[must_use]
    pub fn reference_field_in(
        mut self,
        field: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        self.references
            .insert(field.into(), ReferenceField::in_bucket(bucket));
        self
    }

    /// The record kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Reference metadata of `field`, if it is marked.
    #[must_use]
    pub fn reference(&self, field: &str) -> Option<&ReferenceField> {
        self.references.get(field)
    }
}

/// Implemented by types that declare their own descriptor.
pub trait Described {
    /// The descriptor for this type.
    fn descriptor() -> TypeDescriptor;
}

/// The set of record kinds the rewriter may descend into.
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    kinds: HashMap<String, TypeDescriptor>,
    plain: Option<TypeDescriptor>,
}

impl DescriptorRegistry {
    /// An empty registry: only untyped records are descended.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any previous one for the same kind.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.kinds.insert(descriptor.kind.clone(), descriptor);
        self
    }

    /// Register the descriptor a type declares.
    pub fn register_type<T: Described>(&mut self) -> &mut Self {
        self.register(T::descriptor())
    }

    /// Builder-style [`DescriptorRegistry::register`].
    #[must_use]
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Reference fields applied to untyped records.
    #[must_use]
    pub fn with_plain_fields(mut self, descriptor: TypeDescriptor) -> Self {
        self.plain = Some(descriptor);
        self
    }

    /// Descriptor registered for `kind`.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&TypeDescriptor> {
        self.kinds.get(kind)
    }

    /// Descriptor applied to untyped records, if any.
    #[must_use]
    pub fn plain(&self) -> Option<&TypeDescriptor> {
        self.plain.as_ref()
    }
}
