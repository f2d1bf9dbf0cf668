//! Bucket access policy documents.

use serde_json::json;

use crate::config::Visibility;

/// Policy language version stamped on every document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Grant the action.
    Allow,
    /// Refuse the action.
    Deny,
}

impl Effect {
    /// Policy-language spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// A single-statement policy governing anonymous `s3:GetObject` on every
/// object of one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPolicy {
    bucket: String,
    effect: Effect,
}

impl BucketPolicy {
    /// The policy for a bucket of the given visibility: deny for private
    /// buckets, allow for public ones.
    pub fn for_bucket(bucket: impl Into<String>, visibility: Visibility) -> Self {
        let effect = match visibility {
            Visibility::Private => Effect::Deny,
            Visibility::Public => Effect::Allow,
        };
        Self {
            bucket: bucket.into(),
            effect,
        }
    }

    /// The statement effect.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// The policy as a JSON value.
    #[must_use]
    pub fn document(&self) -> serde_json::Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Effect": self.effect.as_str(),
                "Principal": { "AWS": ["*"] },
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/*", self.bucket)],
            }],
        })
    }

    /// The policy serialized as a JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.document().to_string()
    }
}
