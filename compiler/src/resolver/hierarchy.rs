//! Phase 3: struct parent chains and field flattening.
//!
//! Parent edges form at most a chain per struct, but diamond-free cycles
//! are still possible (`A : B`, `B : A`), so the walk uses the classic
//! three-color marking. White structs are unvisited, gray structs are on
//! the current chain, black structs are fully flattened. Hitting a gray
//! parent means the edge closes a cycle, reported at that edge.
//!
//! Flattening runs in the topological order the walk produces: a parent's
//! flattened fields are always installed before any child copies them.

use fxhash::FxHashMap;
use indexmap::IndexMap;
use log::debug;
use parser::ast::{ClassDefinition, StructDefinition};
use parser::error::{ParseResult, PositionalError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Validate every struct's parent chain and install flattened field lists.
pub(crate) fn run(structs: &mut IndexMap<String, StructDefinition>) -> ParseResult<()> {
    let mut colors: FxHashMap<String, Color> = FxHashMap::default();
    let mut order: Vec<String> = Vec::with_capacity(structs.len());
    let names: Vec<String> = structs.keys().cloned().collect();
    for name in &names {
        visit(name, structs, &mut colors, &mut order)?;
    }

    for name in &order {
        let (flat_names, flat_types) = {
            let definition = &structs[name];
            if definition.is_flattened() {
                continue;
            }
            match &definition.parent_name {
                None => (
                    definition.local_field_names.clone(),
                    definition.local_field_types.clone(),
                ),
                Some(parent_token) => {
                    let parent = &structs[&parent_token.value];
                    let mut flat_names = parent
                        .flat_field_names
                        .clone()
                        .unwrap_or_default();
                    let mut flat_types = parent
                        .flat_field_types
                        .clone()
                        .unwrap_or_default();
                    flat_names.extend(definition.local_field_names.iter().cloned());
                    flat_types.extend(definition.local_field_types.iter().cloned());
                    (flat_names, flat_types)
                }
            }
        };
        debug!("flattened struct {} to {} fields", name, flat_names.len());
        structs
            .get_mut(name)
            .unwrap()
            .set_flat_fields(flat_names, flat_types)?;
    }
    Ok(())
}

fn visit(
    name: &str,
    structs: &IndexMap<String, StructDefinition>,
    colors: &mut FxHashMap<String, Color>,
    order: &mut Vec<String>,
) -> ParseResult<()> {
    match colors.get(name) {
        Some(Color::Black) => return Ok(()),
        Some(Color::Gray) => unreachable!("gray nodes are handled at the edge"),
        None => {}
    }
    colors.insert(name.to_string(), Color::Gray);
    if let Some(parent_token) = &structs[name].parent_name {
        let parent = parent_token.value.as_str();
        if !structs.contains_key(parent) {
            return Err(PositionalError::structural(
                parent_token,
                format!("Could not find a struct by the name of '{}'.", parent),
            ));
        }
        match colors.get(parent) {
            Some(Color::Gray) => {
                return Err(PositionalError::structural(
                    parent_token,
                    format!("The parent chain of '{}' creates a cycle.", name),
                ));
            }
            Some(Color::Black) => {}
            None => visit(parent, structs, colors, order)?,
        }
    }
    colors.insert(name.to_string(), Color::Black);
    order.push(name.to_string());
    Ok(())
}

/// Classes are single-level; a declared parent is rejected up front.
pub(crate) fn check_class_inheritance(
    classes: &IndexMap<String, ClassDefinition>,
) -> ParseResult<()> {
    for class in classes.values() {
        if let Some(inherit_token) = &class.inherit_token {
            return Err(PositionalError::structural(
                inherit_token,
                "Class inheritance is not currently supported.",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::token::Token;
    use parser::types::TypeDescriptor;

    fn simple_struct(
        name: &str,
        fields: &[(&str, TypeDescriptor)],
        parent: Option<&str>,
    ) -> StructDefinition {
        StructDefinition::new(
            Token::synthetic("struct"),
            Token::synthetic(name),
            fields.iter().map(|(_, t)| t.clone()).collect(),
            fields.iter().map(|(n, _)| Token::synthetic(*n)).collect(),
            parent.map(Token::synthetic),
        )
    }

    fn registry(structs: Vec<StructDefinition>) -> IndexMap<String, StructDefinition> {
        structs
            .into_iter()
            .map(|s| (s.name().to_string(), s))
            .collect()
    }

    #[test]
    fn parent_fields_come_first_in_declaration_order() {
        let mut structs = registry(vec![
            simple_struct(
                "Point3",
                &[("z", TypeDescriptor::int())],
                Some("Point"),
            ),
            simple_struct(
                "Point",
                &[("x", TypeDescriptor::int()), ("y", TypeDescriptor::int())],
                None,
            ),
        ]);
        run(&mut structs).unwrap();
        let point3 = &structs["Point3"];
        let names: Vec<&str> = point3
            .flat_field_names
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(point3.flat_field_index("z"), Some(2));
    }

    #[test]
    fn two_node_cycle_is_reported_at_the_closing_edge() {
        let mut structs = registry(vec![
            simple_struct("A", &[], Some("B")),
            simple_struct("B", &[], Some("A")),
        ]);
        let err = run(&mut structs).unwrap_err();
        assert!(err.message.contains("creates a cycle"));
    }

    #[test]
    fn self_cycle_is_reported() {
        let mut structs = registry(vec![simple_struct("A", &[], Some("A"))]);
        let err = run(&mut structs).unwrap_err();
        assert!(err.message.contains("creates a cycle"));
    }

    #[test]
    fn unknown_parent_is_reported() {
        let mut structs = registry(vec![simple_struct("A", &[], Some("Ghost"))]);
        let err = run(&mut structs).unwrap_err();
        assert!(err.message.contains("Could not find a struct"));
    }

    #[test]
    fn shadowing_an_inherited_field_is_rejected() {
        let mut structs = registry(vec![
            simple_struct("Base", &[("x", TypeDescriptor::int())], None),
            simple_struct("Derived", &[("x", TypeDescriptor::double())], Some("Base")),
        ]);
        let err = run(&mut structs).unwrap_err();
        assert!(err.message.contains("hides an inherited definition"));
    }

    #[test]
    fn deep_chains_flatten_in_order() {
        let mut structs = registry(vec![
            simple_struct("C", &[("c", TypeDescriptor::int())], Some("B")),
            simple_struct("B", &[("b", TypeDescriptor::int())], Some("A")),
            simple_struct("A", &[("a", TypeDescriptor::int())], None),
        ]);
        run(&mut structs).unwrap();
        assert_eq!(structs["C"].flat_field_count(), 3);
        assert_eq!(structs["C"].flat_field_index("a"), Some(0));
        assert_eq!(structs["C"].flat_field_index("c"), Some(2));
    }
}
