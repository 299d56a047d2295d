use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// Wraps passenger data so it never shows up in `Debug`/`Display` output.
/// Serialization still yields the real value for the event consumers that need it.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_logs() {
        let name = Masked::new("Radha Sharma".to_string());
        assert_eq!(format!("{:?}", name), "********");
        assert_eq!(format!("{}", name), "********");
        assert_eq!(name.expose(), "Radha Sharma");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let name = Masked::new("Radha Sharma".to_string());
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Radha Sharma\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_inner(), "Radha Sharma");
    }
}
