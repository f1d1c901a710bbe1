use std::fmt::Debug;
use std::hash::Hash;

/// The closed list of fields an entity exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vocabulary {
    entity: &'static str,
    fields: &'static [&'static str],
}

impl Vocabulary {
    pub const fn new(entity: &'static str, fields: &'static [&'static str]) -> Self {
        Self { entity, fields }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Finds the canonical spelling of `field`, ignoring ASCII case.
    pub fn resolve(&self, field: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(field))
    }
}

/// A typed field of one entity, usually declared with [`field_vocabulary!`](crate::field_vocabulary).
pub trait FieldToken: Copy + Eq + Hash + Debug + 'static {
    const VOCABULARY: Vocabulary;

    fn field_name(self) -> &'static str;
}

/// Declares the field enumeration of an entity.
///
/// ```ignore
/// field_vocabulary! {
///     pub enum ItemField for "Item" {
///         Name => "Name",
///         CreatedAt => "CreatedAt",
///     }
/// }
/// ```
#[macro_export]
macro_rules! field_vocabulary {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident for $entity:literal {
            $($(#[$variant_meta:meta])* $variant:ident => $field:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant,)*
        }

        impl $crate::FieldToken for $name {
            const VOCABULARY: $crate::Vocabulary =
                $crate::Vocabulary::new($entity, &[$($field),*]);

            fn field_name(self) -> &'static str {
                match self {
                    $($name::$variant => $field,)*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::field_vocabulary! {
        enum Sample for "Sample" {
            Id => "id",
            DisplayName => "displayName",
        }
    }

    #[test]
    fn declares_tokens_and_vocabulary() {
        assert_eq!(Sample::VOCABULARY.entity(), "Sample");
        assert_eq!(Sample::VOCABULARY.fields(), ["id", "displayName"]);
        assert_eq!(Sample::DisplayName.field_name(), "displayName");
    }

    #[test]
    fn resolves_names_ignoring_ascii_case() {
        assert_eq!(Sample::VOCABULARY.resolve("DISPLAYNAME"), Some("displayName"));
        assert_eq!(Sample::VOCABULARY.resolve("display_name"), None);
        assert!(Sample::VOCABULARY.contains("id"));
        assert!(!Sample::VOCABULARY.contains("ID"));
    }
}
