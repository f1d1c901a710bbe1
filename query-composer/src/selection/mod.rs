//! Bounded, polymorphic selection trees.
//!
//! A [`QueryNode`] is built up through checked mutations and turned into a read-only [`Query`]
//! by [`QueryNode::build`]. Every failed mutation leaves the node as it was.
use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Serialize;

use crate::coerce::ScalarKind;
use crate::coerce::to_wire_value;
use crate::coerce::to_wire_value_as;
use crate::config::SelectionLimits;
use crate::error::ComposeError;
use crate::error::SelectionConflict;
use crate::normalize::normalize;
use crate::value::Value;

mod render;
mod vocabulary;

pub use vocabulary::FieldToken;
pub use vocabulary::Vocabulary;

pub const PAGINATION_MIN: u8 = 1;
pub const PAGINATION_MAX: u8 = 100;
/// The argument carrying the pagination bound.
pub const PAGINATION_ARGUMENT: Name = name!("first");

fn parse_name(name: &str) -> Result<Name, ComposeError> {
    Name::new(name).map_err(|_| ComposeError::InvalidName(name.to_string()))
}

/// The selection of one field: its leaf fields, nested relations, polymorphic casts and
/// arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    name: Name,
    vocabulary: Vocabulary,
    fields: IndexSet<Name>,
    arguments: IndexMap<Name, serde_json::Value>,
    children: IndexMap<Name, QueryNode>,
    casts: IndexMap<Name, IndexMap<Name, QueryNode>>,
    pagination: Option<u8>,
}

impl QueryNode {
    /// Creates an empty selection of `name` whose fields come from `T`'s vocabulary.
    pub fn new<T: FieldToken>(name: &str) -> Result<Self, ComposeError> {
        Self::with_vocabulary(name, T::VOCABULARY)
    }

    pub fn with_vocabulary(name: &str, vocabulary: Vocabulary) -> Result<Self, ComposeError> {
        Ok(Self {
            name: parse_name(name)?,
            vocabulary,
            fields: IndexSet::new(),
            arguments: IndexMap::new(),
            children: IndexMap::new(),
            casts: IndexMap::new(),
            pagination: None,
        })
    }

    /// The field this node selects. Attaching a node renames it to its relation or type
    /// condition.
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    pub fn fields(&self) -> &IndexSet<Name> {
        &self.fields
    }

    pub fn arguments(&self) -> &IndexMap<Name, serde_json::Value> {
        &self.arguments
    }

    pub fn children(&self) -> &IndexMap<Name, QueryNode> {
        &self.children
    }

    /// Casts per relation, each keyed by type condition in registration order.
    pub fn casts(&self) -> &IndexMap<Name, IndexMap<Name, QueryNode>> {
        &self.casts
    }

    pub fn pagination(&self) -> Option<u8> {
        self.pagination
    }

    /// Adds typed fields. Selecting a field twice has no further effect.
    pub fn select_fields<T: FieldToken>(
        &mut self,
        tokens: impl IntoIterator<Item = T>,
    ) -> Result<&mut Self, ComposeError> {
        let mut names = Vec::new();
        for token in tokens {
            let field = token.field_name();
            if T::VOCABULARY.entity() != self.vocabulary.entity() || !self.vocabulary.contains(field)
            {
                return Err(ComposeError::UnknownFieldToken {
                    entity: self.vocabulary.entity().to_string(),
                    token: field.to_string(),
                });
            }
            names.push(parse_name(field)?);
        }
        self.extend_fields(names);
        Ok(self)
    }

    /// Adds fields by name, matched against the vocabulary ignoring ASCII case.
    pub fn select_field_names<'a>(
        &mut self,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> Result<&mut Self, ComposeError> {
        let mut names = Vec::new();
        for field in fields {
            let canonical = self.vocabulary.resolve(field).ok_or_else(|| {
                ComposeError::UnknownFieldToken {
                    entity: self.vocabulary.entity().to_string(),
                    token: field.to_string(),
                }
            })?;
            names.push(parse_name(canonical)?);
        }
        self.extend_fields(names);
        Ok(self)
    }

    fn extend_fields(&mut self, names: Vec<Name>) {
        for name in names {
            tracing::trace!(node = %self.name, field = %name, "selected field");
            self.fields.insert(name);
        }
    }

    /// Nests `child` under `relation`.
    pub fn select_child(
        &mut self,
        relation: &str,
        mut child: QueryNode,
    ) -> Result<&mut Self, ComposeError> {
        let relation = parse_name(relation)?;
        let conflict = if self.children.contains_key(&relation) {
            Some(SelectionConflict::PlainChild)
        } else if self.casts.contains_key(&relation) {
            Some(SelectionConflict::PolymorphicCasts)
        } else {
            None
        };
        if let Some(conflict) = conflict {
            return Err(ComposeError::DuplicateSelection {
                relation: relation.to_string(),
                conflict,
            });
        }

        tracing::debug!(node = %self.name, relation = %relation, "selected child");
        child.name = relation.clone();
        self.children.insert(relation, child);
        Ok(self)
    }

    /// Selects `child` on `relation` when its runtime type is `target_type`.
    ///
    /// Casts on the same relation accumulate in registration order; a relation cannot also
    /// have a plain child.
    pub fn select_polymorphic_cast(
        &mut self,
        relation: &str,
        target_type: &str,
        mut child: QueryNode,
    ) -> Result<&mut Self, ComposeError> {
        let relation = parse_name(relation)?;
        let target_type = parse_name(target_type)?;
        if self.children.contains_key(&relation) {
            return Err(ComposeError::DuplicateSelection {
                relation: relation.to_string(),
                conflict: SelectionConflict::PlainChild,
            });
        }
        if self
            .casts
            .get(&relation)
            .is_some_and(|casts| casts.contains_key(&target_type))
        {
            return Err(ComposeError::DuplicateSelection {
                relation: relation.to_string(),
                conflict: SelectionConflict::TypeCondition(target_type.to_string()),
            });
        }
        // Inline fragments take no arguments.
        if child.pagination.is_some() || !child.arguments.is_empty() {
            return Err(ComposeError::ArgumentsOnCast {
                relation: relation.to_string(),
                type_condition: target_type.to_string(),
            });
        }

        tracing::debug!(
            node = %self.name,
            relation = %relation,
            type_condition = %target_type,
            "selected polymorphic cast"
        );
        child.name = target_type.clone();
        self.casts
            .entry(relation)
            .or_default()
            .insert(target_type, child);
        Ok(self)
    }

    /// Bounds the number of returned items. Only values in `[1, 100]` are accepted.
    pub fn set_pagination(&mut self, first: i64) -> Result<&mut Self, ComposeError> {
        let bound = u8::try_from(first)
            .ok()
            .filter(|bound| (PAGINATION_MIN..=PAGINATION_MAX).contains(bound))
            .ok_or(ComposeError::PaginationOutOfRange {
                value: first,
                min: PAGINATION_MIN,
                max: PAGINATION_MAX,
            })?;
        self.pagination = Some(bound);
        Ok(self)
    }

    pub fn clear_pagination(&mut self) -> &mut Self {
        self.pagination = None;
        self
    }

    /// Normalizes `value` and attaches it as an argument, each scalar taking its natural kind.
    pub fn set_argument<T>(&mut self, name: &str, value: &T) -> Result<&mut Self, ComposeError>
    where
        T: ?Sized + Serialize,
    {
        let name = self.argument_name(name)?;
        let wire = to_wire_value(&normalize(value)?)?;
        self.insert_argument(name, wire)
    }

    /// Like [`set_argument`](Self::set_argument), but an absent value leaves the node alone.
    pub fn set_optional_argument<T>(
        &mut self,
        name: &str,
        value: Option<&T>,
    ) -> Result<&mut Self, ComposeError>
    where
        T: ?Sized + Serialize,
    {
        match value {
            Some(value) => self.set_argument(name, value),
            None => Ok(self),
        }
    }

    /// Attaches an already normalized scalar, or list of scalars, coerced to `kind`.
    pub fn set_typed_argument(
        &mut self,
        name: &str,
        value: &Value,
        kind: ScalarKind,
    ) -> Result<&mut Self, ComposeError> {
        let name = self.argument_name(name)?;
        let wire = to_wire_value_as(value, kind)?;
        self.insert_argument(name, wire)
    }

    /// Attaches an already normalized value, each scalar taking its natural kind.
    pub fn set_canonical_argument(
        &mut self,
        name: &str,
        value: &Value,
    ) -> Result<&mut Self, ComposeError> {
        let name = self.argument_name(name)?;
        let wire = to_wire_value(value)?;
        self.insert_argument(name, wire)
    }

    fn argument_name(&self, name: &str) -> Result<Name, ComposeError> {
        let name = parse_name(name)?;
        if name == PAGINATION_ARGUMENT || self.arguments.contains_key(&name) {
            return Err(ComposeError::DuplicateArgument(name.to_string()));
        }
        Ok(name)
    }

    fn insert_argument(
        &mut self,
        name: Name,
        value: serde_json::Value,
    ) -> Result<&mut Self, ComposeError> {
        check_object_keys(&value)?;
        tracing::debug!(node = %self.name, argument = %name, "set argument");
        self.arguments.insert(name, value);
        Ok(self)
    }

    /// Validates the tree with the default limits.
    pub fn build(self) -> Result<Query, ComposeError> {
        self.build_with(&SelectionLimits::default())
    }

    /// Checks that every node selects at least one field and that nesting stays within
    /// `limits`.
    pub fn build_with(self, limits: &SelectionLimits) -> Result<Query, ComposeError> {
        let path = self.name.to_string();
        validate(&self, &path, 1, limits.max_depth)?;
        Ok(Query { root: self })
    }
}

// Object keys are written unquoted, so they must be names as well.
fn check_object_keys(value: &serde_json::Value) -> Result<(), ComposeError> {
    match value {
        serde_json::Value::Array(items) => items.iter().try_for_each(check_object_keys),
        serde_json::Value::Object(object) => object
            .iter()
            .try_for_each(|(key, value)| parse_name(key).and_then(|_| check_object_keys(value))),
        _ => Ok(()),
    }
}

fn validate(node: &QueryNode, path: &str, depth: usize, max_depth: usize) -> Result<(), ComposeError> {
    if depth > max_depth {
        tracing::error!(limit = max_depth, path, "selection recursion limit exceeded");
        return Err(ComposeError::RecursionLimitExceeded { limit: max_depth });
    }
    if node.fields.is_empty() {
        return Err(ComposeError::EmptySelection {
            path: path.to_string(),
        });
    }
    for (relation, child) in &node.children {
        validate(child, &format!("{path}.{relation}"), depth + 1, max_depth)?;
    }
    for (relation, casts) in &node.casts {
        for (type_condition, child) in casts {
            validate(
                child,
                &format!("{path}.{relation}<{type_condition}>"),
                depth + 1,
                max_depth,
            )?;
        }
    }
    Ok(())
}

/// A complete, validated selection tree.
///
/// `{}` renders it on one line and `{:#}` indents it.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    root: QueryNode,
}

impl Query {
    pub fn root(&self) -> &QueryNode {
        &self.root
    }

    pub fn into_inner(self) -> QueryNode {
        self.root
    }

    /// Wraps the selection into an operation of the given type.
    pub fn to_operation(&self, operation_type: OperationType) -> Operation<'_> {
        Operation {
            operation_type,
            query: self,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::write_query(f, &self.root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
}

/// The operation document body of a [`Query`], e.g. `query { items { Name } }`.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    operation_type: OperationType,
    query: &'a Query,
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::write_operation(f, self.operation_type, &self.query.root)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    crate::field_vocabulary! {
        enum ItemField for "Item" {
            Name => "Name",
            CreatedAt => "CreatedAt",
        }
    }

    crate::field_vocabulary! {
        enum OwnerField for "Owner" {
            Email => "Email",
        }
    }

    fn item() -> QueryNode {
        QueryNode::new::<ItemField>("items").unwrap()
    }

    #[test]
    fn rejects_tokens_of_another_entity() {
        let mut node = item();
        node.select_fields([ItemField::Name]).unwrap();
        let error = node.select_fields([OwnerField::Email]).unwrap_err();
        assert_eq!(
            error,
            ComposeError::UnknownFieldToken {
                entity: "Item".to_string(),
                token: "Email".to_string(),
            }
        );
        assert_eq!(node.fields().len(), 1);
    }

    #[test]
    fn a_failing_batch_adds_nothing() {
        let mut node = item();
        let error = node
            .select_field_names(["createdat", "Nope"])
            .unwrap_err();
        assert_eq!(error.extension_code(), "UNKNOWN_FIELD_TOKEN");
        assert!(node.fields().is_empty());

        node.select_field_names(["createdat"]).unwrap();
        assert_eq!(node.fields().iter().collect::<Vec<_>>(), [&name!("CreatedAt")]);
    }

    #[test]
    fn pagination_keeps_prior_value_on_failure() {
        let mut node = item();
        node.set_pagination(10).unwrap();
        assert!(node.set_pagination(0).is_err());
        assert!(node.set_pagination(256).is_err());
        assert_eq!(node.pagination(), Some(10));
        node.clear_pagination();
        assert_eq!(node.pagination(), None);
    }

    #[test]
    fn arguments_are_unique_and_first_is_reserved() {
        let mut node = item();
        node.set_argument("filter", "abc").unwrap();
        assert_eq!(
            node.set_argument("filter", "again").unwrap_err(),
            ComposeError::DuplicateArgument("filter".to_string())
        );
        assert_eq!(
            node.set_argument("first", &3).unwrap_err(),
            ComposeError::DuplicateArgument("first".to_string())
        );
        assert_eq!(
            node.set_argument("not a name", &3).unwrap_err(),
            ComposeError::InvalidName("not a name".to_string())
        );
        assert_eq!(node.arguments().len(), 1);
    }

    #[test]
    fn object_keys_must_be_names() {
        let mut node = item();
        let value = serde_json::json!({"ok": {"also ok?": 1}});
        assert_eq!(
            node.set_argument("where", &value).unwrap_err(),
            ComposeError::InvalidName("also ok?".to_string())
        );
        assert!(node.arguments().is_empty());
    }

    #[test]
    fn optional_arguments() {
        let mut node = item();
        node.set_optional_argument::<str>("skipped", None).unwrap();
        node.set_optional_argument("kept", Some(&true)).unwrap();
        node.set_canonical_argument("ids", &Value::from(vec![Value::from(1u64), Value::Null]))
            .unwrap();
        assert_eq!(
            node.arguments().keys().map(Name::as_str).collect::<Vec<_>>(),
            ["kept", "ids"]
        );
        assert_eq!(node.arguments()[1], serde_json::json!([1, null]));
    }

    #[test]
    fn attaching_renames_the_child() {
        let mut owner = QueryNode::new::<OwnerField>("whatever").unwrap();
        owner.select_fields([OwnerField::Email]).unwrap();
        let mut node = item();
        node.select_child("Owner", owner).unwrap();
        assert_eq!(node.children()[0].name(), &name!("Owner"));
    }

    #[test]
    fn build_reports_the_path_of_an_empty_selection() {
        let mut node = item();
        node.select_fields([ItemField::Name]).unwrap();
        let owner = QueryNode::new::<OwnerField>("Owner").unwrap();
        node.select_polymorphic_cast("Record", "TypeA", owner).unwrap();
        assert_eq!(
            node.build().unwrap_err(),
            ComposeError::EmptySelection {
                path: "items.Record<TypeA>".to_string()
            }
        );
    }

    #[test_log::test]
    fn build_enforces_the_depth_limit() {
        let mut node = item();
        node.select_fields([ItemField::Name]).unwrap();
        for _ in 0..3 {
            let mut parent = item();
            parent.select_fields([ItemField::Name]).unwrap();
            parent.select_child("nested", node).unwrap();
            node = parent;
        }
        let limits = SelectionLimits { max_depth: 3 };
        assert_eq!(
            node.clone().build_with(&limits).unwrap_err(),
            ComposeError::RecursionLimitExceeded { limit: 3 }
        );
        assert!(node.build_with(&SelectionLimits { max_depth: 4 }).is_ok());
    }
}
