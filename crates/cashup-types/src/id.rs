use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(UserId);
string_id!(FestivalId);
string_id!(
    /// Normalized bin code, e.g. `TRASH_BIN_03`.
    BinId
);
string_id!(PhotoId);
string_id!(CouponId);

fn derive_id(parts: &[&str], nanos: i64) -> String {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"/");
    }
    hasher.update(&nanos.to_le_bytes());
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

impl UserId {
    pub fn generate(display_name: &str, nanos: i64) -> Self {
        Self(derive_id(&["user", display_name], nanos))
    }
}

impl FestivalId {
    pub fn generate(name: &str, nanos: i64) -> Self {
        Self(derive_id(&["festival", name], nanos))
    }
}

impl PhotoId {
    /// Derive a photo id from its natural key plus a submission timestamp.
    pub fn generate(user: &UserId, festival: &FestivalId, nanos: i64) -> Self {
        Self(derive_id(&["photo", user.as_str(), festival.as_str()], nanos))
    }
}

impl CouponId {
    pub fn generate(user: &UserId, festival: &FestivalId, nanos: i64) -> Self {
        Self(derive_id(&["coupon", user.as_str(), festival.as_str()], nanos))
    }
}
