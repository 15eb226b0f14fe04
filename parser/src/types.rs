//! The type descriptor and template unifier.
//!
//! A [`TypeDescriptor`] is the structural representation of a source type:
//! a root name, ordered generic parameters, and derived flags. Single
//! character roots are template variables bound during unification.
//!
//! Nullability is not inferred from the casing of a type name. Named types
//! carry an explicit reference-type flag that is resolved once, via
//! [`TypeDescriptor::finalize`], against the declared-type registry.

use crate::error::{ParseResult, PositionalError};
use crate::token::Token;
use fxhash::FxHashMap;
use std::fmt;

/// Broad classification of a descriptor's root, derived at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Primitive,
    Object,
    Void,
    Null,
    Template,
    List,
    Array,
    Dictionary,
    Function,
    /// A struct or class referenced by name; resolved during finalization.
    Named,
}

/// Lookup interface for declared struct/class names, implemented by the
/// compiler's registry. Only finalization consults it.
pub trait DeclaredTypes {
    fn is_declared_type(&self, name: &str) -> bool;
}

/// Structural representation of a source type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Originating token; `None` for builtin singletons and synthesized types.
    pub first_token: Option<Token>,
    pub root: String,
    pub generics: Vec<TypeDescriptor>,
    pub category: TypeCategory,
    /// True if the root is a template variable or any generic carries one.
    pub has_template: bool,
    /// Set by `finalize` for declared struct/class types.
    reference_type: bool,
    finalized: bool,
}

impl TypeDescriptor {
    pub fn new(
        first_token: Option<Token>,
        root: impl Into<String>,
        generics: Vec<TypeDescriptor>,
    ) -> ParseResult<Self> {
        let root = root.into();
        // A templated root may never carry its own generic parameters.
        if root.chars().count() == 1 && !generics.is_empty() {
            return Err(Self::construction_error(
                first_token.as_ref(),
                "Cannot have a templated root type with generics.",
            ));
        }
        let category = Self::categorize(first_token.as_ref(), &root, generics.len())?;
        let has_template =
            category == TypeCategory::Template || generics.iter().any(|g| g.has_template);
        Ok(Self {
            first_token,
            root,
            generics,
            category,
            has_template,
            reference_type: false,
            finalized: false,
        })
    }

    fn categorize(
        first_token: Option<&Token>,
        root: &str,
        generic_count: usize,
    ) -> ParseResult<TypeCategory> {
        match generic_count {
            1 => match root {
                "List" => return Ok(TypeCategory::List),
                "Array" => return Ok(TypeCategory::Array),
                "Func" => return Ok(TypeCategory::Function),
                _ => {
                    return Err(Self::construction_error(
                        first_token,
                        "A generic cannot be applied to this type.",
                    ))
                }
            },
            2 => match root {
                "Dictionary" => return Ok(TypeCategory::Dictionary),
                "Func" => return Ok(TypeCategory::Function),
                _ => {
                    return Err(Self::construction_error(
                        first_token,
                        "Two generics cannot be applied to this type.",
                    ))
                }
            },
            n if n > 2 => {
                if root == "Func" {
                    return Ok(TypeCategory::Function);
                }
                return Err(Self::construction_error(
                    first_token,
                    "Invalid number of generics.",
                ));
            }
            _ => {}
        }
        Ok(match root {
            "null" => TypeCategory::Null,
            "void" => TypeCategory::Void,
            "object" => TypeCategory::Object,
            "int" | "char" | "double" | "bool" | "string" | "number" | "byte" | "StringBuilder" => {
                TypeCategory::Primitive
            }
            "List" | "Array" | "Dictionary" => {
                return Err(Self::construction_error(
                    first_token,
                    "This type requires generics.",
                ))
            }
            _ if root.chars().count() == 1 => TypeCategory::Template,
            _ => TypeCategory::Named,
        })
    }

    fn construction_error(first_token: Option<&Token>, message: &str) -> PositionalError {
        let fallback = Token::synthetic("<type>");
        PositionalError::invariant(first_token.unwrap_or(&fallback), message)
    }

    fn builtin(root: &str) -> Self {
        // Builtin roots never fail categorization.
        Self::new(None, root, Vec::new()).unwrap()
    }

    pub fn int() -> Self {
        Self::builtin("int")
    }

    pub fn char_type() -> Self {
        Self::builtin("char")
    }

    pub fn bool_type() -> Self {
        Self::builtin("bool")
    }

    pub fn string() -> Self {
        Self::builtin("string")
    }

    pub fn double() -> Self {
        Self::builtin("double")
    }

    pub fn void() -> Self {
        Self::builtin("void")
    }

    pub fn null() -> Self {
        Self::builtin("null")
    }

    pub fn number() -> Self {
        Self::builtin("number")
    }

    pub fn object() -> Self {
        Self::builtin("object")
    }

    pub fn string_builder() -> Self {
        Self::builtin("StringBuilder")
    }

    pub fn template(name: char) -> Self {
        Self::new(None, name.to_string(), Vec::new()).unwrap()
    }

    pub fn list_of(item: TypeDescriptor) -> Self {
        Self::new(None, "List", vec![item]).unwrap()
    }

    pub fn array_of(item: TypeDescriptor) -> Self {
        Self::new(None, "Array", vec![item]).unwrap()
    }

    pub fn dictionary_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::new(None, "Dictionary", vec![key, value]).unwrap()
    }

    /// `Func<ReturnType, Arg1, Arg2, ...>`
    pub fn function_of(return_type: TypeDescriptor, arg_types: Vec<TypeDescriptor>) -> Self {
        let mut generics = vec![return_type];
        generics.extend(arg_types);
        Self::new(None, "Func", generics).unwrap()
    }

    pub fn is_template_root(&self) -> bool {
        self.category == TypeCategory::Template
    }

    pub fn is_reference_type(&self) -> bool {
        self.reference_type
    }

    /// Can a `null` live in a slot of this type?
    pub fn is_nullable(&self) -> bool {
        match self.category {
            TypeCategory::Object
            | TypeCategory::List
            | TypeCategory::Array
            | TypeCategory::Dictionary
            | TypeCategory::Function => true,
            TypeCategory::Primitive => self.root == "string" || self.root == "StringBuilder",
            TypeCategory::Named => self.reference_type,
            _ => false,
        }
    }

    /// Resolve named roots against the declared-type registry and mark them
    /// as reference types. Idempotent; recurses into generics. Unknown names
    /// are a hard error.
    pub fn finalize(&mut self, declared: &dyn DeclaredTypes) -> ParseResult<()> {
        if !self.finalized {
            self.finalized = true;
            if self.category == TypeCategory::Named {
                if !declared.is_declared_type(&self.root) {
                    return Err(Self::construction_error(
                        self.first_token.as_ref(),
                        &format!(
                            "Could not find a class or struct by the name of '{}'.",
                            self.root
                        ),
                    ));
                }
                self.reference_type = true;
            }
        }
        for generic in &mut self.generics {
            generic.finalize(declared)?;
        }
        Ok(())
    }

    /// Structural equality with the bidirectional `number` ~ `int`/`double`
    /// compatibility rule. Arity mismatch is never identical.
    pub fn is_identical(&self, other: &TypeDescriptor) -> bool {
        if self.generics.len() != other.generics.len() {
            return false;
        }
        if self.root != other.root {
            let roots = (self.root.as_str(), other.root.as_str());
            let number_compat = matches!(
                roots,
                ("number", "int") | ("number", "double") | ("int", "number") | ("double", "number")
            );
            if !number_compat {
                return false;
            }
        }
        self.generics
            .iter()
            .zip(other.generics.iter())
            .all(|(a, b)| a.is_identical(b))
    }

    /// Can `value` be assigned into a slot declared as `target`?
    pub fn check_assignment(target: &TypeDescriptor, value: &TypeDescriptor) -> bool {
        if target.category == TypeCategory::Void {
            return false;
        }
        Self::check_return_type(target, value)
    }

    /// Can `value` be returned from a function declared to return `target`?
    pub fn check_return_type(target: &TypeDescriptor, value: &TypeDescriptor) -> bool {
        if target.is_identical(value) {
            return true;
        }
        if target.category == TypeCategory::Object {
            return true;
        }
        if target.category == TypeCategory::Void {
            return false;
        }
        if value.category == TypeCategory::Null {
            return target.is_nullable();
        }
        false
    }

    /// Substitute bound template variables with their concrete types.
    /// Explicit fast-path: descriptors without template variables come back
    /// unchanged without walking generics.
    pub fn resolve_templates(&self, templates: &TemplateMap) -> TypeDescriptor {
        if !self.has_template {
            return self.clone();
        }
        if self.is_template_root() {
            if let Some(bound) = templates.get(&self.root) {
                return bound.clone();
            }
            return self.clone();
        }
        let generics: Vec<TypeDescriptor> = self
            .generics
            .iter()
            .map(|g| g.resolve_templates(templates))
            .collect();
        // Unbound variables may survive substitution; the flag must track
        // what actually remains or a later pass would skip them.
        let has_template = generics.iter().any(|g| g.has_template);
        TypeDescriptor {
            first_token: self.first_token.clone(),
            root: self.root.clone(),
            generics,
            category: self.category,
            has_template,
            reference_type: self.reference_type,
            finalized: self.finalized,
        }
    }

    /// Match a templated descriptor against a concrete one, binding template
    /// variables into `templates`. Returns false on any mismatch; callers
    /// convert that into a positional diagnostic naming the argument.
    pub fn unify_with_output(
        templated: &TypeDescriptor,
        actual: &TypeDescriptor,
        templates: &mut TemplateMap,
    ) -> bool {
        // The universal object type accepts anything without recording.
        if templated.category == TypeCategory::Object {
            return true;
        }
        if templated.is_identical(actual) {
            return true;
        }
        if templated.is_template_root() {
            if let Some(required) = templates.get(&templated.root) {
                // Later occurrences must match the first recorded binding,
                // except a null actual against a nullable recorded type.
                if actual.is_identical(required) {
                    return true;
                }
                return actual.category == TypeCategory::Null && required.is_nullable();
            }
            templates.bind(&templated.root, actual.clone());
            return true;
        }
        if templated.generics.len() != actual.generics.len() {
            return false;
        }
        if templated.root != actual.root {
            return false;
        }
        templated
            .generics
            .iter()
            .zip(actual.generics.iter())
            .all(|(t, a)| Self::unify_with_output(t, a, templates))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        if !self.generics.is_empty() {
            write!(f, "<")?;
            for (i, generic) in self.generics.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", generic)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Bindings from template variable names to the concrete type first
/// observed for each variable during a unification walk.
#[derive(Debug, Default)]
pub struct TemplateMap {
    bindings: FxHashMap<String, TypeDescriptor>,
}

impl TemplateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.bindings.get(name)
    }

    pub fn bind(&mut self, name: &str, descriptor: TypeDescriptor) {
        self.bindings.insert(name.to_string(), descriptor);
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoTypes;
    impl DeclaredTypes for NoTypes {
        fn is_declared_type(&self, _name: &str) -> bool {
            false
        }
    }

    struct WithValue;
    impl DeclaredTypes for WithValue {
        fn is_declared_type(&self, name: &str) -> bool {
            name == "Value"
        }
    }

    fn named(name: &str) -> TypeDescriptor {
        TypeDescriptor::new(Some(Token::synthetic(name)), name, Vec::new()).unwrap()
    }

    fn finalized_named(name: &str) -> TypeDescriptor {
        let mut ty = named(name);
        ty.finalize(&WithValue).unwrap();
        ty
    }

    #[test]
    fn templated_root_with_generics_is_rejected() {
        let result = TypeDescriptor::new(None, "T", vec![TypeDescriptor::int()]);
        assert!(result.is_err());
    }

    #[test]
    fn container_arity_is_validated() {
        assert!(TypeDescriptor::new(None, "List", Vec::new()).is_err());
        assert!(TypeDescriptor::new(None, "int", vec![TypeDescriptor::int()]).is_err());
        assert!(
            TypeDescriptor::new(None, "Dictionary", vec![TypeDescriptor::int()]).is_err()
        );
    }

    #[test]
    fn identity_is_reflexive_and_order_sensitive() {
        let list_int = TypeDescriptor::list_of(TypeDescriptor::int());
        let list_double = TypeDescriptor::list_of(TypeDescriptor::double());
        assert!(list_int.is_identical(&list_int));
        assert!(!list_int.is_identical(&list_double));

        let dict_a = TypeDescriptor::dictionary_of(TypeDescriptor::int(), TypeDescriptor::string());
        let dict_b = TypeDescriptor::dictionary_of(TypeDescriptor::string(), TypeDescriptor::int());
        assert!(!dict_a.is_identical(&dict_b));
    }

    #[test]
    fn number_is_compatible_with_int_and_double() {
        let number = TypeDescriptor::number();
        assert!(number.is_identical(&TypeDescriptor::int()));
        assert!(number.is_identical(&TypeDescriptor::double()));
        assert!(TypeDescriptor::int().is_identical(&number));
        assert!(TypeDescriptor::double().is_identical(&number));
        assert!(!TypeDescriptor::int().is_identical(&TypeDescriptor::double()));
    }

    #[test]
    fn void_target_rejects_everything() {
        let void = TypeDescriptor::void();
        assert!(!TypeDescriptor::check_assignment(&void, &TypeDescriptor::int()));
        assert!(!TypeDescriptor::check_assignment(&void, &void));
    }

    #[test]
    fn null_goes_into_nullable_targets_only() {
        let null = TypeDescriptor::null();
        assert!(TypeDescriptor::check_assignment(&TypeDescriptor::string(), &null));
        assert!(!TypeDescriptor::check_assignment(&TypeDescriptor::int(), &null));
        let list = TypeDescriptor::list_of(TypeDescriptor::int());
        assert!(TypeDescriptor::check_assignment(&list, &null));
        assert!(TypeDescriptor::check_assignment(&finalized_named("Value"), &null));
    }

    #[test]
    fn object_accepts_everything() {
        let object = TypeDescriptor::object();
        assert!(TypeDescriptor::check_assignment(&object, &TypeDescriptor::int()));
        assert!(TypeDescriptor::check_assignment(
            &object,
            &TypeDescriptor::list_of(TypeDescriptor::string())
        ));
    }

    #[test]
    fn reference_flag_comes_from_registry_not_casing() {
        let mut unknown = named("Widget");
        assert!(unknown.finalize(&NoTypes).is_err());

        let value = finalized_named("Value");
        assert!(value.is_reference_type());
        assert!(value.is_nullable());
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut ty = TypeDescriptor::list_of(named("Value"));
        ty.finalize(&WithValue).unwrap();
        ty.finalize(&WithValue).unwrap();
        assert!(ty.generics[0].is_reference_type());
    }

    #[test]
    fn unification_binds_then_requires_consistency() {
        let t = TypeDescriptor::template('T');
        let mut map = TemplateMap::new();
        assert!(TypeDescriptor::unify_with_output(&t, &TypeDescriptor::int(), &mut map));
        assert!(!TypeDescriptor::unify_with_output(&t, &TypeDescriptor::double(), &mut map));
        assert!(map.get("T").unwrap().is_identical(&TypeDescriptor::int()));
    }

    #[test]
    fn unification_accepts_null_only_for_nullable_bindings() {
        let t = TypeDescriptor::template('T');
        let mut ints = TemplateMap::new();
        assert!(TypeDescriptor::unify_with_output(&t, &TypeDescriptor::int(), &mut ints));
        assert!(!TypeDescriptor::unify_with_output(&t, &TypeDescriptor::null(), &mut ints));

        let mut strings = TemplateMap::new();
        assert!(TypeDescriptor::unify_with_output(&t, &TypeDescriptor::string(), &mut strings));
        assert!(TypeDescriptor::unify_with_output(&t, &TypeDescriptor::null(), &mut strings));
    }

    #[test]
    fn unification_recurses_into_generics() {
        let templated = TypeDescriptor::list_of(TypeDescriptor::template('T'));
        let actual = TypeDescriptor::list_of(TypeDescriptor::string());
        let mut map = TemplateMap::new();
        assert!(TypeDescriptor::unify_with_output(&templated, &actual, &mut map));
        assert!(map.get("T").unwrap().is_identical(&TypeDescriptor::string()));

        let mismatched = TypeDescriptor::array_of(TypeDescriptor::string());
        let mut map2 = TemplateMap::new();
        assert!(!TypeDescriptor::unify_with_output(&templated, &mismatched, &mut map2));
    }

    #[test]
    fn object_root_unifies_without_recording() {
        let object = TypeDescriptor::object();
        let mut map = TemplateMap::new();
        assert!(TypeDescriptor::unify_with_output(
            &object,
            &TypeDescriptor::list_of(TypeDescriptor::int()),
            &mut map
        ));
        assert!(map.is_empty());
    }

    #[test]
    fn template_substitution_with_fast_path() {
        let mut map = TemplateMap::new();
        map.bind("T", TypeDescriptor::int());

        let templated = TypeDescriptor::dictionary_of(
            TypeDescriptor::string(),
            TypeDescriptor::template('T'),
        );
        let resolved = templated.resolve_templates(&map);
        assert_eq!(resolved.to_string(), "Dictionary<string, int>");
        assert!(!resolved.has_template);

        // No template variables: comes back unchanged.
        let plain = TypeDescriptor::list_of(TypeDescriptor::double());
        let same = plain.resolve_templates(&map);
        assert!(same.is_identical(&plain));
    }

    #[test]
    fn unbound_template_survives_substitution() {
        let map = TemplateMap::new();
        let t = TypeDescriptor::template('K');
        assert_eq!(t.resolve_templates(&map).to_string(), "K");
    }

    #[test]
    fn unbound_templates_stay_substitutable() {
        // Resolving against an empty map binds nothing; the survivor must
        // still accept a second substitution round.
        let templated = TypeDescriptor::list_of(TypeDescriptor::template('T'));
        let survivor = templated.resolve_templates(&TemplateMap::new());
        assert!(survivor.has_template);

        let mut map = TemplateMap::new();
        map.bind("T", TypeDescriptor::int());
        let resolved = survivor.resolve_templates(&map);
        assert!(resolved.is_identical(&TypeDescriptor::list_of(TypeDescriptor::int())));
        assert!(!resolved.has_template);
    }

    #[test]
    fn display_formats_generics() {
        let ty = TypeDescriptor::dictionary_of(
            TypeDescriptor::string(),
            TypeDescriptor::list_of(TypeDescriptor::int()),
        );
        assert_eq!(ty.to_string(), "Dictionary<string, List<int>>");
    }
}
