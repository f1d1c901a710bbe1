use std::fmt;
use std::fmt::Display;

use apollo_compiler::Name;
use indexmap::IndexMap;

use super::OperationType;
use super::PAGINATION_ARGUMENT;
use super::QueryNode;
use crate::display_helpers::DisplayCommaSeparated;
use crate::display_helpers::State;

enum Item<'a> {
    Field(&'a Name),
    Child(&'a QueryNode),
    Casts(&'a Name, &'a IndexMap<Name, QueryNode>),
}

pub(super) fn write_query(f: &mut fmt::Formatter<'_>, root: &QueryNode) -> fmt::Result {
    write_node(&mut State::new(f), root)
}

pub(super) fn write_operation(
    f: &mut fmt::Formatter<'_>,
    operation_type: OperationType,
    root: &QueryNode,
) -> fmt::Result {
    let mut state = State::new(f);
    write!(state, "{operation_type} ")?;
    state.block([root], write_node)
}

fn write_node(state: &mut State<'_, '_>, node: &QueryNode) -> fmt::Result {
    state.write(&node.name)?;
    write_arguments(state, node)?;
    state.write(" ")?;
    write_selection_set(state, node)
}

fn write_arguments(state: &mut State<'_, '_>, node: &QueryNode) -> fmt::Result {
    if node.pagination.is_none() && node.arguments.is_empty() {
        return Ok(());
    }
    let first_name = PAGINATION_ARGUMENT;
    let pagination = node
        .pagination
        .map(|first| Argument(&first_name, Literal::Number(first)));
    let arguments = node
        .arguments
        .iter()
        .map(|(name, value)| Argument(name, Literal::Json(value)));
    write!(
        state,
        "({})",
        DisplayCommaSeparated(pagination.into_iter().chain(arguments))
    )
}

fn write_selection_set(state: &mut State<'_, '_>, node: &QueryNode) -> fmt::Result {
    let items = node
        .fields
        .iter()
        .map(Item::Field)
        .chain(node.children.values().map(Item::Child))
        .chain(
            node.casts
                .iter()
                .map(|(relation, casts)| Item::Casts(relation, casts)),
        );
    state.block(items, |state, item| match item {
        Item::Field(name) => state.write(name),
        Item::Child(child) => write_node(state, child),
        Item::Casts(relation, casts) => {
            write!(state, "{relation} ")?;
            state.block(casts, |state, (type_condition, child)| {
                write!(state, "... on {type_condition} ")?;
                write_selection_set(state, child)
            })
        }
    })
}

#[derive(Clone)]
struct Argument<'a>(&'a Name, Literal<'a>);

impl Display for Argument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0, self.1)
    }
}

/// A GraphQL input literal.
#[derive(Clone, Copy)]
enum Literal<'a> {
    Number(u8),
    Json(&'a serde_json::Value),
}

impl Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Literal::Number(number) => return write!(f, "{number}"),
            Literal::Json(value) => value,
        };
        match value {
            serde_json::Value::Null => f.write_str("null"),
            serde_json::Value::Bool(value) => write!(f, "{value}"),
            serde_json::Value::Number(value) => write!(f, "{value}"),
            serde_json::Value::String(value) => {
                let quoted = serde_json::to_string(value).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            serde_json::Value::Array(items) => write!(
                f,
                "[{}]",
                DisplayCommaSeparated(items.iter().map(Literal::Json))
            ),
            serde_json::Value::Object(object) => write!(
                f,
                "{{{}}}",
                DisplayCommaSeparated(
                    object
                        .iter()
                        .map(|(key, value)| ObjectField(key, Literal::Json(value)))
                )
            ),
        }
    }
}

#[derive(Clone)]
struct ObjectField<'a>(&'a str, Literal<'a>);

impl Display for ObjectField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn literals() {
        let value = json!({"name": "a \"quoted\" value", "ids": [1, 2.5, null], "on": true});
        assert_eq!(
            Literal::Json(&value).to_string(),
            r#"{name: "a \"quoted\" value", ids: [1, 2.5, null], on: true}"#
        );
        assert_eq!(Literal::Json(&json!([])).to_string(), "[]");
    }
}
