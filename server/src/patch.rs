//! Tri-state field updates for partial `PUT` bodies.
//!
//! A JSON field that is absent leaves the stored value alone, `null` clears
//! it, and any other value replaces it. Use with `#[serde(default)]` so a
//! missing field deserializes to [`Patch::Unchanged`].

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// Apply to a nullable field.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Unchanged => {}
            Patch::Clear => *target = None,
            Patch::Set(value) => *target = Some(value),
        }
    }
}

impl Patch<String> {
    /// Treat an empty string like `null`.
    pub fn empty_as_clear(self) -> Self {
        match self {
            Patch::Set(s) if s.trim().is_empty() => Patch::Clear,
            other => other,
        }
    }

    /// Apply to an optional text field, storing blanks as `None`.
    pub fn apply_text(self, target: &mut Option<String>) {
        self.empty_as_clear().apply_to(target)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default)]
        hobby: Patch<String>,
        #[serde(default)]
        age: Patch<u32>,
    }

    #[test]
    fn test_absent_null_and_value_are_distinct() {
        let body: Body = serde_json::from_str(r#"{"hobby": null}"#).unwrap();
        assert_eq!(body.hobby, Patch::Clear);
        assert_eq!(body.age, Patch::Unchanged);

        let body: Body = serde_json::from_str(r#"{"hobby": "tea", "age": 30}"#).unwrap();
        assert_eq!(body.hobby, Patch::Set("tea".to_string()));
        assert_eq!(body.age, Patch::Set(30));
    }

    #[test]
    fn test_apply_to() {
        let mut field = Some("old".to_string());
        Patch::Unchanged.apply_to(&mut field);
        assert_eq!(field.as_deref(), Some("old"));
        Patch::Set("new".to_string()).apply_to(&mut field);
        assert_eq!(field.as_deref(), Some("new"));
        Patch::Clear.apply_to(&mut field);
        assert_eq!(field, None);
    }

    #[test]
    fn test_empty_string_clears() {
        assert_eq!(Patch::Set("  ".to_string()).empty_as_clear(), Patch::Clear);
        assert_eq!(
            Patch::Set("x".to_string()).empty_as_clear(),
            Patch::Set("x".to_string())
        );
        assert!(Patch::<String>::Unchanged.empty_as_clear().is_unchanged());

        let mut field = Some("old".to_string());
        Patch::Set(" ".to_string()).apply_text(&mut field);
        assert_eq!(field, None);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(serde_json::from_str::<Body>(r#"{"age": "thirty"}"#).is_err());
    }
}
