//! Top-level compilation entities.
//!
//! Entities are constructed once by the parser, mutated in place by the
//! three resolution passes, and then treated as read-only input to
//! emission. Bodies are ordered statement lists rewritten pass by pass.

use crate::ast::expr::Expression;
use crate::ast::stmt::Statement;
use crate::error::{ParseResult, PositionalError};
use crate::token::Token;
use crate::types::TypeDescriptor;
use fxhash::FxHashMap;

/// Discriminant for every top-level declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilationEntityKind {
    Function,
    Struct,
    Class,
    Constructor,
    Field,
    Enum,
    Constant,
    Global,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub first_token: Token,
    pub name_token: Token,
    pub return_type: TypeDescriptor,
    pub arg_types: Vec<TypeDescriptor>,
    pub arg_names: Vec<Token>,
    pub body: Vec<Statement>,
    /// Owning class name; `None` for a top-level function.
    pub class_name: Option<String>,
}

impl FunctionDefinition {
    pub fn new(
        name_token: Token,
        return_type: TypeDescriptor,
        arg_types: Vec<TypeDescriptor>,
        arg_names: Vec<Token>,
        body: Vec<Statement>,
        class_name: Option<String>,
    ) -> Self {
        let first_token = return_type
            .first_token
            .clone()
            .unwrap_or_else(|| name_token.clone());
        Self {
            first_token,
            name_token,
            return_type,
            arg_types,
            arg_names,
            body,
            class_name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name_token.value
    }
}

#[derive(Debug, Clone)]
pub struct ConstructorDefinition {
    pub first_token: Token,
    pub arg_types: Vec<TypeDescriptor>,
    pub arg_names: Vec<Token>,
    pub body: Vec<Statement>,
    pub class_name: String,
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name_token: Token,
    pub field_type: TypeDescriptor,
    pub value: Expression,
    pub class_name: String,
}

impl FieldDefinition {
    pub fn name(&self) -> &str {
        &self.name_token.value
    }
}

/// A struct: local fields plus, after hierarchy resolution, the flattened
/// field list (parent's flattened fields followed by local fields) with a
/// stable name-to-index lookup.
#[derive(Debug, Clone)]
pub struct StructDefinition {
    pub first_token: Token,
    pub name_token: Token,
    pub local_field_types: Vec<TypeDescriptor>,
    pub local_field_names: Vec<Token>,
    pub parent_name: Option<Token>,
    /// `None` until inherited-field resolution has run; the sentinel makes
    /// that step idempotent.
    pub flat_field_types: Option<Vec<TypeDescriptor>>,
    pub flat_field_names: Option<Vec<Token>>,
    flat_field_index_by_name: Option<FxHashMap<String, usize>>,
}

impl StructDefinition {
    pub fn new(
        first_token: Token,
        name_token: Token,
        local_field_types: Vec<TypeDescriptor>,
        local_field_names: Vec<Token>,
        parent_name: Option<Token>,
    ) -> Self {
        Self {
            first_token,
            name_token,
            local_field_types,
            local_field_names,
            parent_name,
            flat_field_types: None,
            flat_field_names: None,
            flat_field_index_by_name: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name_token.value
    }

    pub fn is_flattened(&self) -> bool {
        self.flat_field_names.is_some()
    }

    /// Install the flattened field list; rejects local names shadowing
    /// inherited ones.
    pub fn set_flat_fields(
        &mut self,
        names: Vec<Token>,
        types: Vec<TypeDescriptor>,
    ) -> ParseResult<()> {
        let mut index_by_name = FxHashMap::default();
        for (i, name_token) in names.iter().enumerate() {
            let name = name_token.value.clone();
            if index_by_name.contains_key(&name) {
                return Err(PositionalError::structural(
                    name_token,
                    format!("This struct field hides an inherited definition of '{}'.", name),
                ));
            }
            index_by_name.insert(name, i);
        }
        self.flat_field_names = Some(names);
        self.flat_field_types = Some(types);
        self.flat_field_index_by_name = Some(index_by_name);
        Ok(())
    }

    pub fn flat_field_index(&self, name: &str) -> Option<usize> {
        self.flat_field_index_by_name.as_ref()?.get(name).copied()
    }

    pub fn flat_field_count(&self) -> usize {
        self.flat_field_names.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn flat_field_type(&self, index: usize) -> Option<&TypeDescriptor> {
        self.flat_field_types.as_ref()?.get(index)
    }
}

/// A class: members partitioned by kind into name-sorted field and method
/// arrays, plus exactly one constructor. Classes are single-level here;
/// the inherit token slot exists but no parent chain is resolved.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub first_token: Token,
    pub name_token: Token,
    pub inherit_token: Option<Token>,
    pub fields: Vec<FieldDefinition>,
    pub methods: Vec<FunctionDefinition>,
    pub constructor: Option<ConstructorDefinition>,
}

impl ClassDefinition {
    pub fn new(first_token: Token, name_token: Token, inherit_token: Option<Token>) -> Self {
        Self {
            first_token,
            name_token,
            inherit_token,
            fields: Vec::new(),
            methods: Vec::new(),
            constructor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name_token.value
    }

    /// Install members, sorting fields and methods by name for
    /// deterministic downstream emission. Duplicate member names and a
    /// second constructor are structural errors.
    pub fn add_members(
        &mut self,
        fields: Vec<FieldDefinition>,
        methods: Vec<FunctionDefinition>,
        constructor: ConstructorDefinition,
    ) -> ParseResult<()> {
        let mut seen: FxHashMap<String, ()> = FxHashMap::default();
        for token in fields
            .iter()
            .map(|f| &f.name_token)
            .chain(methods.iter().map(|m| &m.name_token))
        {
            if seen.insert(token.value.clone(), ()).is_some() {
                return Err(PositionalError::structural(
                    token,
                    format!("The class member '{}' is declared twice.", token.value),
                ));
            }
        }
        if self.constructor.is_some() {
            return Err(PositionalError::structural(
                &constructor.first_token,
                "This class already has a constructor.",
            ));
        }
        self.fields = fields;
        self.methods = methods;
        self.fields.sort_by(|a, b| a.name().cmp(b.name()));
        self.methods.sort_by(|a, b| a.name().cmp(b.name()));
        self.constructor = Some(constructor);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn method(&self, name: &str) -> Option<&FunctionDefinition> {
        self.methods.iter().find(|m| m.name() == name)
    }
}

/// An enum with integer member values; unspecified members auto-assign
/// sequentially after the previous value, starting at 0.
#[derive(Debug, Clone)]
pub struct EnumDefinition {
    pub first_token: Token,
    pub name_token: Token,
    pub member_names: Vec<Token>,
    pub member_values: Vec<Option<Expression>>,
    /// Populated by constant resolution.
    resolved_values: Option<FxHashMap<String, i64>>,
}

impl EnumDefinition {
    pub fn new(
        first_token: Token,
        name_token: Token,
        member_names: Vec<Token>,
        member_values: Vec<Option<Expression>>,
    ) -> Self {
        assert_eq!(member_names.len(), member_values.len());
        Self {
            first_token,
            name_token,
            member_names,
            member_values,
            resolved_values: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name_token.value
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_values.is_some()
    }

    pub fn set_resolved_values(&mut self, values: FxHashMap<String, i64>) {
        self.resolved_values = Some(values);
    }

    pub fn resolved_value(&self, member: &str) -> Option<i64> {
        self.resolved_values.as_ref()?.get(member).copied()
    }
}

/// A top-level `const` or mutable global.
#[derive(Debug, Clone)]
pub struct TopLevelVariable {
    pub kind: CompilationEntityKind,
    pub declared_type: TypeDescriptor,
    pub name_token: Token,
    pub value: Expression,
}

impl TopLevelVariable {
    pub fn constant(declared_type: TypeDescriptor, name_token: Token, value: Expression) -> Self {
        Self {
            kind: CompilationEntityKind::Constant,
            declared_type,
            name_token,
            value,
        }
    }

    pub fn global(declared_type: TypeDescriptor, name_token: Token, value: Expression) -> Self {
        Self {
            kind: CompilationEntityKind::Global,
            declared_type,
            name_token,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name_token.value
    }

    pub fn is_constant(&self) -> bool {
        self.kind == CompilationEntityKind::Constant
    }
}

/// Everything the parser hands to the semantic pipeline for one
/// compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub functions: Vec<FunctionDefinition>,
    pub structs: Vec<StructDefinition>,
    pub classes: Vec<ClassDefinition>,
    pub enums: Vec<EnumDefinition>,
    pub variables: Vec<TopLevelVariable>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_field(name: &str) -> (TypeDescriptor, Token) {
        (TypeDescriptor::int(), Token::synthetic(name))
    }

    #[test]
    fn flat_fields_reject_shadowing() {
        let (ta, a) = int_field("x");
        let (tb, b) = int_field("x");
        let mut def = StructDefinition::new(
            Token::synthetic("struct"),
            Token::synthetic("Derived"),
            Vec::new(),
            Vec::new(),
            None,
        );
        let err = def.set_flat_fields(vec![a, b], vec![ta, tb]).unwrap_err();
        assert!(err.message.contains("hides an inherited definition"));
    }

    #[test]
    fn flat_field_lookup_is_stable() {
        let (ta, a) = int_field("x");
        let (tb, b) = int_field("y");
        let mut def = StructDefinition::new(
            Token::synthetic("struct"),
            Token::synthetic("Point"),
            Vec::new(),
            Vec::new(),
            None,
        );
        def.set_flat_fields(vec![a, b], vec![ta, tb]).unwrap();
        assert_eq!(def.flat_field_index("x"), Some(0));
        assert_eq!(def.flat_field_index("y"), Some(1));
        assert_eq!(def.flat_field_count(), 2);
    }

    #[test]
    fn class_members_are_sorted_by_name() {
        let mut class = ClassDefinition::new(
            Token::synthetic("class"),
            Token::synthetic("Machine"),
            None,
        );
        let ctor = ConstructorDefinition {
            first_token: Token::synthetic("constructor"),
            arg_types: Vec::new(),
            arg_names: Vec::new(),
            body: Vec::new(),
            class_name: "Machine".to_string(),
        };
        let make_method = |name: &str| {
            FunctionDefinition::new(
                Token::synthetic(name),
                TypeDescriptor::void(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Some("Machine".to_string()),
            )
        };
        class
            .add_members(
                Vec::new(),
                vec![make_method("zeta"), make_method("alpha")],
                ctor,
            )
            .unwrap();
        let names: Vec<&str> = class.methods.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let mut class =
            ClassDefinition::new(Token::synthetic("class"), Token::synthetic("Box"), None);
        let ctor = ConstructorDefinition {
            first_token: Token::synthetic("constructor"),
            arg_types: Vec::new(),
            arg_names: Vec::new(),
            body: Vec::new(),
            class_name: "Box".to_string(),
        };
        let field = FieldDefinition {
            name_token: Token::synthetic("size"),
            field_type: TypeDescriptor::int(),
            value: Expression::integer(Token::synthetic("0"), 0),
            class_name: "Box".to_string(),
        };
        let method = FunctionDefinition::new(
            Token::synthetic("size"),
            TypeDescriptor::int(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Some("Box".to_string()),
        );
        assert!(class.add_members(vec![field], vec![method], ctor).is_err());
    }
}
