use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Stock-keeping unit. Groups batches and order lines by product type.
    Sku
);

string_id!(
    /// Unique reference of an inventory batch.
    BatchReference
);

string_id!(
    /// Identifier of a customer order.
    OrderId
);

impl BatchReference {
    /// Generates a random batch reference of the form `batch-<uuid>`.
    pub fn generate() -> Self {
        Self(format!("batch-{}", Uuid::new_v4().simple()))
    }
}

impl OrderId {
    /// Generates a random order identifier of the form `order-<uuid>`.
    pub fn generate() -> Self {
        Self(format!("order-{}", Uuid::new_v4().simple()))
    }
}

/// Optimistic concurrency token carried by every aggregate.
///
/// A freshly created aggregate starts at [`Version::initial`] and every
/// mutation moves it to [`Version::next`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a new aggregate.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_references_are_unique() {
        let a = BatchReference::generate();
        let b = BatchReference::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("batch-"));
    }

    #[test]
    fn generated_order_ids_are_prefixed() {
        assert!(OrderId::generate().as_str().starts_with("order-"));
    }

    #[test]
    fn sku_serializes_as_plain_string() {
        let sku = Sku::from("RETRO-CLOCK");
        let json = serde_json::to_string(&sku).unwrap();
        assert_eq!(json, "\"RETRO-CLOCK\"");
        let back: Sku = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sku);
    }

    #[test]
    fn version_advances() {
        let v = Version::initial();
        assert_eq!(v.as_i64(), 0);
        assert_eq!(v.next(), Version::new(1));
        assert!(v < v.next());
    }
}
