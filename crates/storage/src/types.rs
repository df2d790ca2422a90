//! Identifier newtypes shared across stores.

/// Defines a transparent `i64` newtype with serde, `From` conversions and
/// `Display`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

define_id!(
    /// Opaque user key. Carried as the `sub` claim of every token.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokengate_storage::UserId;
    ///
    /// let id = UserId::from(42);
    /// assert_eq!(id.to_string(), "42");
    /// assert_eq!("42".parse::<UserId>().unwrap(), id);
    /// ```
    UserId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&UserId::from(7)).unwrap();
        assert_eq!(json, "7");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserId(7));
    }

    #[test]
    fn test_user_id_rejects_non_numeric_text() {
        assert!("seven".parse::<UserId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }
}
