use std::fmt;

use serde::{Deserialize, Serialize};

/// Annotation key under which the resizer used for a PVC is recorded.
///
/// Exported for callers that tag claim metadata; nothing in this crate
/// reads or writes it.
pub const VOLUME_RESIZER_KEY: &str = "volume.kubernetes.io/storage-resizer";

/// Key type for pods.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniquePodName(String);

/// Key type for persistent volume claims.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniquePvcName(String);

macro_rules! string_key {
    ($ty:ident) => {
        impl $ty {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $ty {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $ty {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_key!(UniquePodName);
string_key!(UniquePvcName);

/// Externally observed progress of a volume operation.
///
/// Advisory labels for caller-side bookkeeping. The caller's lifecycle is
/// `InProgress -> Finished | NoChange`; starting a new operation begins a new
/// lifecycle rather than moving a terminal record back to `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    /// The operation has finished.
    Finished,
    /// The operation has been started. Says nothing about whether it will
    /// succeed.
    InProgress,
    /// Unchanged from the previous state. Used to mark transient failures of
    /// an operation that was already in progress.
    NoChange,
}

impl OperationStatus {
    /// Returns the wire/string form of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finished => "Finished",
            Self::InProgress => "InProgress",
            Self::NoChange => "NoChange",
        }
    }

    /// `true` for `Finished` and `NoChange`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
