//! Lexical variable scopes for type resolution.
//!
//! Scopes form a parent chain rooted at the enclosing function or
//! constructor. The root carries what `return` and `this` need to check
//! against; child scopes are created for `if`/`while` bodies and dropped
//! when the block ends. A `switch` body deliberately shares its enclosing
//! scope.

use fxhash::FxHashMap;
use parser::error::{ParseResult, PositionalError};
use parser::token::Token;
use parser::types::TypeDescriptor;

/// The function or constructor a scope chain hangs off of.
#[derive(Debug, Clone)]
pub struct ScopeRoot {
    pub entity_name: String,
    pub is_constructor: bool,
    /// `void` for constructors.
    pub return_type: TypeDescriptor,
    /// Set when the body belongs to a class member; enables `this`.
    pub class_name: Option<String>,
}

impl ScopeRoot {
    pub fn function(name: impl Into<String>, return_type: TypeDescriptor) -> Self {
        Self {
            entity_name: name.into(),
            is_constructor: false,
            return_type,
            class_name: None,
        }
    }

    pub fn method(
        name: impl Into<String>,
        return_type: TypeDescriptor,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: name.into(),
            is_constructor: false,
            return_type,
            class_name: Some(class_name.into()),
        }
    }

    pub fn constructor(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self {
            entity_name: class_name.clone(),
            is_constructor: true,
            return_type: TypeDescriptor::void(),
            class_name: Some(class_name),
        }
    }
}

/// One frame of the lexical scope chain.
#[derive(Debug)]
pub struct VariableScope<'a> {
    root: &'a ScopeRoot,
    parent: Option<&'a VariableScope<'a>>,
    bindings: FxHashMap<String, TypeDescriptor>,
}

impl<'a> VariableScope<'a> {
    pub fn of_root(root: &'a ScopeRoot) -> Self {
        Self {
            root,
            parent: None,
            bindings: FxHashMap::default(),
        }
    }

    /// A child frame; declarations inside it vanish when it drops.
    pub fn nested(&self) -> VariableScope<'_> {
        VariableScope {
            root: self.root,
            parent: Some(self),
            bindings: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> &ScopeRoot {
        self.root
    }

    /// Declare a variable in this frame. Shadowing anything visible from
    /// here is an error.
    pub fn declare(&mut self, name_token: &Token, var_type: TypeDescriptor) -> ParseResult<()> {
        let name = name_token.value.as_str();
        if self.lookup(name).is_some() {
            return Err(PositionalError::structural(
                name_token,
                format!("There is already a variable named '{}'.", name),
            ));
        }
        self.bindings.insert(name.to_string(), var_type);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        let mut frame = Some(self);
        while let Some(scope) = frame {
            if let Some(found) = scope.bindings.get(name) {
                return Some(found);
            }
            frame = scope.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ScopeRoot {
        ScopeRoot::function("main", TypeDescriptor::void())
    }

    #[test]
    fn lookup_walks_the_parent_chain() {
        let root = root();
        let mut outer = VariableScope::of_root(&root);
        outer
            .declare(&Token::synthetic("x"), TypeDescriptor::int())
            .unwrap();
        let inner = outer.nested();
        assert!(inner.lookup("x").unwrap().is_identical(&TypeDescriptor::int()));
        assert!(inner.lookup("y").is_none());
    }

    #[test]
    fn inner_declarations_do_not_leak_out() {
        let root = root();
        let mut outer = VariableScope::of_root(&root);
        {
            let mut inner = outer.nested();
            inner
                .declare(&Token::synthetic("tmp"), TypeDescriptor::string())
                .unwrap();
            assert!(inner.lookup("tmp").is_some());
        }
        assert!(outer.lookup("tmp").is_none());
        outer
            .declare(&Token::synthetic("tmp"), TypeDescriptor::string())
            .unwrap();
    }

    #[test]
    fn shadowing_is_rejected() {
        let root = root();
        let mut outer = VariableScope::of_root(&root);
        outer
            .declare(&Token::synthetic("x"), TypeDescriptor::int())
            .unwrap();
        let mut inner = outer.nested();
        let err = inner
            .declare(&Token::synthetic("x"), TypeDescriptor::double())
            .unwrap_err();
        assert!(err.message.contains("already a variable"));
    }

    #[test]
    fn constructor_roots_allow_this_and_forbid_return_values() {
        let root = ScopeRoot::constructor("Machine");
        assert!(root.is_constructor);
        assert_eq!(root.class_name.as_deref(), Some("Machine"));
        assert!(root.return_type.is_identical(&TypeDescriptor::void()));
    }
}
