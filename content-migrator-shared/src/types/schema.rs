//! Destination field types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Declared type of a field in a destination component schema.
///
/// Drives the type coercion applied by the field mapper. Unknown type names
/// are kept verbatim in [`FieldType::Other`] and pass values through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Single line plain text.
    Text,
    /// Multi line plain text.
    Textarea,
    /// Structured rich-text document.
    RichText,
    /// Markdown source.
    Markdown,
    /// Link object (url, story or asset link).
    MultiLink,
    /// Date and time.
    DateTime,
    /// Array of nested components.
    Bloks,
    /// Single asset reference.
    Asset,
    /// Settings / enumeration array.
    Options,
    /// Any other declared type.
    Other(String),
}

impl FieldType {
    /// Parse a field type from the name used in destination schemas.
    pub fn parse(name: &str) -> Self {
        match name {
            "text" => Self::Text,
            "textarea" => Self::Textarea,
            "richtext" => Self::RichText,
            "markdown" => Self::Markdown,
            "multilink" => Self::MultiLink,
            "datetime" => Self::DateTime,
            "bloks" => Self::Bloks,
            "asset" => Self::Asset,
            "options" | "settings" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    /// Name of the type as declared by the destination.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::RichText => "richtext",
            Self::Markdown => "markdown",
            Self::MultiLink => "multilink",
            Self::DateTime => "datetime",
            Self::Bloks => "bloks",
            Self::Asset => "asset",
            Self::Options => "options",
            Self::Other(name) => name,
        }
    }

    /// Plain text fields receive markup-stripped values.
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::Text | Self::Textarea)
    }
}

impl Default for FieldType {
    fn default() -> Self {
        Self::Text
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(FieldType::parse("richtext"), FieldType::RichText);
        assert_eq!(FieldType::parse("bloks"), FieldType::Bloks);
        assert_eq!(FieldType::parse("settings"), FieldType::Options);
        assert_eq!(FieldType::parse("options"), FieldType::Options);
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let field_type = FieldType::parse("table");
        assert_eq!(field_type, FieldType::Other("table".to_string()));
        assert_eq!(field_type.as_str(), "table");
        assert!(!field_type.is_plain_text());
    }

    #[test]
    fn test_deserialize_from_schema_json() {
        let field_type: FieldType = serde_json::from_str("\"multilink\"").unwrap();
        assert_eq!(field_type, FieldType::MultiLink);
    }
}
