//! Declarative structural contracts that generated output must satisfy.
//!
//! A [`Schema`] is a static tree of [`Field`]s. The coercer walks a parsed JSON
//! tree against it and emits a normalized tree containing exactly the declared
//! fields, which then deserializes into the agent's typed record.

/// Shape of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    TextList,
    Integer,
    /// Closed set of lowercase variants. Matching is case-insensitive; the
    /// default is used when an optional enum field is absent.
    Enum {
        variants: &'static [&'static str],
        default: &'static str,
    },
    Object(&'static [Field]),
    ObjectList(&'static [Field]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

/// A named top-level contract. Top-level values are always JSON objects.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    /// Names of the top-level fields a value must carry.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNER: &[Field] = &[Field::required("title", FieldType::Text)];

    const SAMPLE: Schema = Schema {
        name: "Sample",
        fields: &[
            Field::required("role", FieldType::Text),
            Field::optional("notes", FieldType::TextList),
            Field::required("items", FieldType::ObjectList(INNER)),
        ],
    };

    #[test]
    fn test_required_fields_lists_only_required() {
        let names: Vec<&str> = SAMPLE.required_fields().collect();
        assert_eq!(names, vec!["role", "items"]);
    }

    #[test]
    fn test_field_constructors_set_required_flag() {
        assert!(Field::required("a", FieldType::Text).required);
        assert!(!Field::optional("a", FieldType::Text).required);
    }
}
