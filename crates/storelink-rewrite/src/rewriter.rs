//! Response rewriting.
//!
//! [`ResponseRewriter::rewrite`] walks a [`Value`] graph and replaces every
//! string leaf that names a stored object with a URL for it. The walk:
//!
//! - leaves null, booleans, numbers and foreign handles alone;
//! - visits each record at most once per call, so shared records are
//!   rewritten once and cycles terminate;
//! - descends into untyped records and into typed records whose kind is
//!   registered, and passes any other record through;
//! - resolves sibling fields and array elements concurrently, with a cap on
//!   in-flight branches, and reassembles them in their original order;
//! - keeps the original string when a reference fails to resolve.
//!
//! Records are rewritten in place, so the returned graph shares identity
//! with the input.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use storelink_core::{ObjectReference, ObjectStore, StoreResult};
use tracing::{debug, trace, warn};

use crate::descriptor::{DescriptorRegistry, ReferenceField, TypeDescriptor};
use crate::error::RewriteError;
use crate::resolver::classify;
use crate::value::{Record, Value};

/// Default cap on concurrently resolved siblings.
pub const DEFAULT_MAX_FAN_OUT: usize = 16;

/// Turns a stored reference into a URL.
#[async_trait]
pub trait ResolveUrl: Send + Sync + fmt::Debug {
    /// Resolve `reference`.
    async fn resolve_url(&self, reference: &ObjectReference) -> StoreResult<String>;
}

#[async_trait]
impl ResolveUrl for ObjectStore {
    async fn resolve_url(&self, reference: &ObjectReference) -> StoreResult<String> {
        self.resolve(reference)
    }
}

/// Rewrites stored references inside response payloads.
#[derive(Debug, Clone)]
pub struct ResponseRewriter {
    resolver: Arc<dyn ResolveUrl>,
    registry: Arc<DescriptorRegistry>,
    max_fan_out: usize,
}

impl ResponseRewriter {
    /// Create a rewriter resolving through `resolver`.
    pub fn new(resolver: Arc<dyn ResolveUrl>, registry: DescriptorRegistry) -> Self {
        Self {
            resolver,
            registry: Arc::new(registry),
            max_fan_out: DEFAULT_MAX_FAN_OUT,
        }
    }

    /// Cap the number of siblings resolved at once (at least 1).
    #[must_use]
    pub fn with_max_fan_out(mut self, max_fan_out: usize) -> Self {
        self.max_fan_out = max_fan_out.max(1);
        self
    }

    /// The descriptor registry in use.
    #[must_use]
    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    /// Rewrite every resolvable reference in `value`.
    pub async fn rewrite(&self, value: Value) -> Value {
        let traversal = Traversal {
            rewriter: self,
            visited: Mutex::new(HashSet::new()),
        };
        let rewritten = traversal.visit(value, String::new(), None).await;
        trace!(records = traversal.visited.lock().len(), "rewrite complete");
        rewritten
    }

    /// Rewrite a JSON payload.
    ///
    /// # Errors
    ///
    /// Never fails for input that came from JSON; the result type covers the
    /// conversion back.
    pub async fn rewrite_json(
        &self,
        value: serde_json::Value,
    ) -> Result<serde_json::Value, RewriteError> {
        self.rewrite(value.into()).await.to_json()
    }
}

/// State of one `rewrite` call.
struct Traversal<'a> {
    rewriter: &'a ResponseRewriter,
    visited: Mutex<HashSet<usize>>,
}

impl<'a> Traversal<'a> {
    fn visit(
        &'a self,
        value: Value,
        path: String,
        marker: Option<&'a ReferenceField>,
    ) -> BoxFuture<'a, Value> {
        async move {
            match value {
                Value::String(s) => self.visit_string(s, &path, marker).await,
                Value::Array(items) => Value::Array(self.visit_array(items, &path, marker).await),
                Value::Object(record) => {
                    self.visit_record(&record, &path).await;
                    Value::Object(record)
                }
                other => other,
            }
        }
        .boxed()
    }

    async fn visit_string(&self, s: String, path: &str, marker: Option<&ReferenceField>) -> Value {
        let Some(reference) = classify(&s, marker) else {
            return Value::String(s);
        };

        match self.rewriter.resolver.resolve_url(&reference).await {
            Ok(url) => {
                debug!(field = path, reference = %reference, "reference resolved");
                Value::String(url)
            }
            Err(err) => {
                warn!(
                    field = path,
                    reference = %s,
                    error = %err,
                    "failed to resolve reference, keeping original value"
                );
                Value::String(s)
            }
        }
    }

    async fn visit_array(
        &'a self,
        items: Vec<Value>,
        path: &str,
        marker: Option<&'a ReferenceField>,
    ) -> Vec<Value> {
        stream::iter(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| self.visit(item, format!("{path}[{i}]"), marker)),
        )
        .buffered(self.rewriter.max_fan_out)
        .collect()
        .await
    }

    async fn visit_record(&'a self, record: &Record, path: &str) {
        let first_visit = self.visited.lock().insert(record.id());
        if !first_visit {
            trace!(field = path, "record already visited");
            return;
        }

        let descriptor: Option<&'a TypeDescriptor> = match record.kind() {
            None => self.rewriter.registry.plain(),
            Some(kind) => match self.rewriter.registry.get(&kind) {
                Some(descriptor) => Some(descriptor),
                None => {
                    trace!(field = path, kind = %kind, "unregistered record kind, not descending");
                    return;
                }
            },
        };

        let fields = record.fields();
        let rewritten: Vec<(String, Value)> = stream::iter(fields.into_iter().map(|(key, value)| {
            let marker = descriptor.and_then(|d| d.reference(&key));
            let child = child_path(path, &key);
            self.visit(value, child, marker).map(move |v| (key, v))
        }))
        .buffered(self.rewriter.max_fan_out)
        .collect()
        .await;

        record.replace_fields(rewritten);
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{parent}.{key}")
    }
}
