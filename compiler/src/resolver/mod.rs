//! The semantic resolution pipeline.
//!
//! A [`Resolver`] owns name-keyed registries for every top-level entity
//! and drives the fixed phase order:
//!
//! 1. constants and enum members fold to literals
//! 2. struct field types finalize against the declared-type registry
//! 3. struct parent chains are validated and fields flattened
//! 4. pass 1: name resolution and dead-code culling
//! 5. signature types finalize (functions, globals, class members)
//! 6. pass 2: type resolution through fresh variable scopes
//! 7. pass 3: resolution with full type context
//!
//! Bodies are taken out of their registry entry by value, rewritten, and
//! put back, so passes never need shared mutable access to the registries
//! they read.

pub(crate) mod constants;
pub(crate) mod context;
pub(crate) mod hierarchy;
pub(crate) mod names;
pub(crate) mod scope;
pub(crate) mod typecheck;

use fxhash::{FxHashMap, FxHashSet};
use indexmap::IndexMap;
use log::{debug, info};
use parser::ast::{
    ClassDefinition, EnumDefinition, FunctionDefinition, Program, StructDefinition,
    TopLevelVariable,
};
use parser::error::{ParseResult, PositionalError};
use parser::token::Token;
use parser::types::{DeclaredTypes, TypeDescriptor};
use parser::Expression;
use scope::{ScopeRoot, VariableScope};
use std::collections::VecDeque;
use std::mem;

/// Registries for one compilation unit plus the pipeline that rewrites
/// them in place.
#[derive(Debug, Default)]
pub struct Resolver {
    pub functions: IndexMap<String, FunctionDefinition>,
    pub structs: IndexMap<String, StructDefinition>,
    pub classes: IndexMap<String, ClassDefinition>,
    pub enums: IndexMap<String, EnumDefinition>,
    pub constants: IndexMap<String, TopLevelVariable>,
    pub globals: IndexMap<String, TopLevelVariable>,
}

impl DeclaredTypes for Resolver {
    fn is_declared_type(&self, name: &str) -> bool {
        self.structs.contains_key(name) || self.classes.contains_key(name)
    }
}

/// Snapshot of the declared type names, so finalization can run while the
/// registries themselves are being mutated.
struct DeclaredNames {
    names: FxHashSet<String>,
}

impl DeclaredTypes for DeclaredNames {
    fn is_declared_type(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

impl Resolver {
    /// Build the registries, rejecting duplicate top-level names. All
    /// entity kinds share one namespace.
    pub fn new(program: Program) -> ParseResult<Self> {
        let mut seen: FxHashMap<String, ()> = FxHashMap::default();
        let mut claim = |token: &Token| -> ParseResult<()> {
            if seen.insert(token.value.clone(), ()).is_some() {
                return Err(PositionalError::structural(
                    token,
                    format!("There is already an entity named '{}'.", token.value),
                ));
            }
            Ok(())
        };

        let mut resolver = Resolver::default();
        for function in program.functions {
            claim(&function.name_token)?;
            resolver
                .functions
                .insert(function.name().to_string(), function);
        }
        for struct_def in program.structs {
            claim(&struct_def.name_token)?;
            resolver
                .structs
                .insert(struct_def.name().to_string(), struct_def);
        }
        for class in program.classes {
            claim(&class.name_token)?;
            resolver.classes.insert(class.name().to_string(), class);
        }
        for enum_def in program.enums {
            claim(&enum_def.name_token)?;
            resolver.enums.insert(enum_def.name().to_string(), enum_def);
        }
        for variable in program.variables {
            claim(&variable.name_token)?;
            let registry = if variable.is_constant() {
                &mut resolver.constants
            } else {
                &mut resolver.globals
            };
            registry.insert(variable.name().to_string(), variable);
        }
        Ok(resolver)
    }

    /// Run the whole pipeline. After this returns `Ok`, every expression
    /// carries a resolved type and the tree is ready for emission.
    pub fn resolve(&mut self) -> ParseResult<()> {
        info!(
            "resolving {} function(s), {} struct(s), {} class(es)",
            self.functions.len(),
            self.structs.len(),
            self.classes.len()
        );
        for class in self.classes.values() {
            if class.constructor.is_none() {
                return Err(PositionalError::structural(
                    &class.first_token,
                    format!("The class '{}' has no constructor.", class.name()),
                ));
            }
        }

        info!("phase: constant and enum folding");
        constants::run(&mut self.enums, &mut self.constants)?;

        info!("phase: struct field types");
        let declared = self.declared_snapshot();
        for struct_def in self.structs.values_mut() {
            for field_type in &mut struct_def.local_field_types {
                field_type.finalize(&declared)?;
            }
        }

        info!("phase: struct hierarchy");
        hierarchy::run(&mut self.structs)?;
        hierarchy::check_class_inheritance(&self.classes)?;

        info!("phase: name resolution");
        self.resolve_names()?;

        info!("phase: signature types");
        self.resolve_signature_types(&declared)?;

        info!("phase: type resolution");
        self.resolve_types()?;

        info!("phase: type context");
        self.resolve_with_type_context()?;
        Ok(())
    }

    fn declared_snapshot(&self) -> DeclaredNames {
        DeclaredNames {
            names: self
                .structs
                .keys()
                .chain(self.classes.keys())
                .cloned()
                .collect(),
        }
    }

    /// Pass 1 over every body. Functions go through a worklist seeded
    /// with every declared function; the done-set makes re-enqueueing a
    /// name a no-op, so the loop terminates even with recursion.
    fn resolve_names(&mut self) -> ParseResult<()> {
        let mut queue: VecDeque<String> = self.functions.keys().cloned().collect();
        let mut done: FxHashSet<String> = FxHashSet::default();
        while let Some(name) = queue.pop_front() {
            if !done.insert(name.clone()) {
                continue;
            }
            debug!("pass 1: function {}", name);
            let body = mem::take(&mut self.functions.get_mut(&name).unwrap().body);
            let body = {
                let cx = self.name_context();
                names::resolve_block(body, &cx)?
            };
            self.functions.get_mut(&name).unwrap().body = body;
        }

        let global_names: Vec<String> = self.globals.keys().cloned().collect();
        for name in global_names {
            let value = take_value(&mut self.globals.get_mut(&name).unwrap().value);
            let value = {
                let cx = self.name_context();
                names::resolve_expression(value, &cx)?
            };
            self.globals.get_mut(&name).unwrap().value = value;
        }

        let class_names: Vec<String> = self.classes.keys().cloned().collect();
        for name in class_names {
            debug!("pass 1: class {}", name);
            // Constructor first, then fields, then methods.
            let body = {
                let class = self.classes.get_mut(&name).unwrap();
                let constructor = class.constructor.as_mut().unwrap();
                mem::take(&mut constructor.body)
            };
            let body = {
                let cx = self.name_context();
                names::resolve_block(body, &cx)?
            };
            self.classes
                .get_mut(&name)
                .unwrap()
                .constructor
                .as_mut()
                .unwrap()
                .body = body;

            let field_count = self.classes[&name].fields.len();
            for i in 0..field_count {
                let value =
                    take_value(&mut self.classes.get_mut(&name).unwrap().fields[i].value);
                let value = {
                    let cx = self.name_context();
                    names::resolve_expression(value, &cx)?
                };
                self.classes.get_mut(&name).unwrap().fields[i].value = value;
            }

            let method_count = self.classes[&name].methods.len();
            for i in 0..method_count {
                let body =
                    mem::take(&mut self.classes.get_mut(&name).unwrap().methods[i].body);
                let body = {
                    let cx = self.name_context();
                    names::resolve_block(body, &cx)?
                };
                self.classes.get_mut(&name).unwrap().methods[i].body = body;
            }
        }
        Ok(())
    }

    fn name_context(&self) -> names::NameContext<'_> {
        names::NameContext {
            functions: &self.functions,
            enums: &self.enums,
            constants: &self.constants,
        }
    }

    fn resolve_signature_types(&mut self, declared: &DeclaredNames) -> ParseResult<()> {
        for function in self.functions.values_mut() {
            function.return_type.finalize(declared)?;
            for arg_type in &mut function.arg_types {
                arg_type.finalize(declared)?;
            }
        }
        for variable in self.constants.values_mut().chain(self.globals.values_mut()) {
            variable.declared_type.finalize(declared)?;
        }
        for class in self.classes.values_mut() {
            for field in &mut class.fields {
                field.field_type.finalize(declared)?;
            }
            for method in &mut class.methods {
                method.return_type.finalize(declared)?;
                for arg_type in &mut method.arg_types {
                    arg_type.finalize(declared)?;
                }
            }
            if let Some(constructor) = class.constructor.as_mut() {
                for arg_type in &mut constructor.arg_types {
                    arg_type.finalize(declared)?;
                }
            }
        }
        Ok(())
    }

    /// Pass 2, in sorted name order so diagnostics and emitted output are
    /// stable regardless of declaration order.
    fn resolve_types(&mut self) -> ParseResult<()> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        for name in names {
            debug!("pass 2: function {}", name);
            let (body, root, arg_names, arg_types) = {
                let function = self.functions.get_mut(&name).unwrap();
                let root = match &function.class_name {
                    Some(class) => {
                        ScopeRoot::method(function.name(), function.return_type.clone(), class)
                    }
                    None => ScopeRoot::function(function.name(), function.return_type.clone()),
                };
                (
                    mem::take(&mut function.body),
                    root,
                    function.arg_names.clone(),
                    function.arg_types.clone(),
                )
            };
            let body = self.resolve_typed_body(body, &root, &arg_names, &arg_types)?;
            self.functions.get_mut(&name).unwrap().body = body;
        }

        let global_names: Vec<String> = self.globals.keys().cloned().collect();
        for name in global_names {
            let (value, declared_type) = {
                let global = self.globals.get_mut(&name).unwrap();
                (take_value(&mut global.value), global.declared_type.clone())
            };
            let root = ScopeRoot::function(name.as_str(), TypeDescriptor::void());
            let scope = VariableScope::of_root(&root);
            let value = typecheck::resolve_expression(value, &scope, self)?;
            let actual = value.require_type()?;
            if !TypeDescriptor::check_assignment(&declared_type, actual) {
                return Err(PositionalError::type_error(
                    &value.first_token,
                    format!("Cannot assign a '{}' to a '{}'.", actual, declared_type),
                ));
            }
            self.globals.get_mut(&name).unwrap().value = value;
        }

        let class_names: Vec<String> = self.classes.keys().cloned().collect();
        for name in class_names {
            debug!("pass 2: class {}", name);
            let (body, arg_names, arg_types) = {
                let class = self.classes.get_mut(&name).unwrap();
                let constructor = class.constructor.as_mut().unwrap();
                (
                    mem::take(&mut constructor.body),
                    constructor.arg_names.clone(),
                    constructor.arg_types.clone(),
                )
            };
            let root = ScopeRoot::constructor(name.clone());
            let body = self.resolve_typed_body(body, &root, &arg_names, &arg_types)?;
            self.classes
                .get_mut(&name)
                .unwrap()
                .constructor
                .as_mut()
                .unwrap()
                .body = body;

            let field_count = self.classes[&name].fields.len();
            for i in 0..field_count {
                let (value, field_type, field_token) = {
                    let field = &mut self.classes.get_mut(&name).unwrap().fields[i];
                    (
                        take_value(&mut field.value),
                        field.field_type.clone(),
                        field.name_token.clone(),
                    )
                };
                // Field initializers run before construction; no `this`.
                let root = ScopeRoot::function(field_token.value.as_str(), TypeDescriptor::void());
                let scope = VariableScope::of_root(&root);
                let value = typecheck::resolve_expression(value, &scope, self)?;
                let actual = value.require_type()?;
                if !TypeDescriptor::check_assignment(&field_type, actual) {
                    return Err(PositionalError::type_error(
                        &value.first_token,
                        format!("Cannot assign a '{}' to a '{}'.", actual, field_type),
                    ));
                }
                self.classes.get_mut(&name).unwrap().fields[i].value = value;
            }

            let method_count = self.classes[&name].methods.len();
            for i in 0..method_count {
                let (body, root, arg_names, arg_types) = {
                    let method = &mut self.classes.get_mut(&name).unwrap().methods[i];
                    let root = ScopeRoot::method(
                        method.name(),
                        method.return_type.clone(),
                        name.clone(),
                    );
                    (
                        mem::take(&mut method.body),
                        root,
                        method.arg_names.clone(),
                        method.arg_types.clone(),
                    )
                };
                let body = self.resolve_typed_body(body, &root, &arg_names, &arg_types)?;
                self.classes.get_mut(&name).unwrap().methods[i].body = body;
            }
        }
        Ok(())
    }

    fn resolve_typed_body(
        &self,
        body: Vec<parser::Statement>,
        root: &ScopeRoot,
        arg_names: &[Token],
        arg_types: &[TypeDescriptor],
    ) -> ParseResult<Vec<parser::Statement>> {
        let mut scope = VariableScope::of_root(root);
        for (arg_name, arg_type) in arg_names.iter().zip(arg_types.iter()) {
            scope.declare(arg_name, arg_type.clone())?;
        }
        typecheck::resolve_body(body, &mut scope, self)
    }

    /// Pass 3, same traversal order as pass 2.
    fn resolve_with_type_context(&mut self) -> ParseResult<()> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        for name in names {
            debug!("pass 3: function {}", name);
            let body = mem::take(&mut self.functions.get_mut(&name).unwrap().body);
            let body = context::resolve_block(body, self)?;
            self.functions.get_mut(&name).unwrap().body = body;
        }

        let global_names: Vec<String> = self.globals.keys().cloned().collect();
        for name in global_names {
            let value = take_value(&mut self.globals.get_mut(&name).unwrap().value);
            let value = context::resolve_expression(value, self)?;
            self.globals.get_mut(&name).unwrap().value = value;
        }

        let class_names: Vec<String> = self.classes.keys().cloned().collect();
        for name in class_names {
            debug!("pass 3: class {}", name);
            let body = {
                let class = self.classes.get_mut(&name).unwrap();
                mem::take(&mut class.constructor.as_mut().unwrap().body)
            };
            let body = context::resolve_block(body, self)?;
            self.classes
                .get_mut(&name)
                .unwrap()
                .constructor
                .as_mut()
                .unwrap()
                .body = body;

            let field_count = self.classes[&name].fields.len();
            for i in 0..field_count {
                let value =
                    take_value(&mut self.classes.get_mut(&name).unwrap().fields[i].value);
                let value = context::resolve_expression(value, self)?;
                self.classes.get_mut(&name).unwrap().fields[i].value = value;
            }

            let method_count = self.classes[&name].methods.len();
            for i in 0..method_count {
                let body =
                    mem::take(&mut self.classes.get_mut(&name).unwrap().methods[i].body);
                let body = context::resolve_block(body, self)?;
                self.classes.get_mut(&name).unwrap().methods[i].body = body;
            }
        }
        Ok(())
    }
}

/// Swap an expression out of its slot, leaving a synthesized null that
/// the caller is required to overwrite.
fn take_value(slot: &mut Expression) -> Expression {
    mem::replace(slot, Expression::null(Token::synthetic("null")))
}

/// Build registries from a program and run the whole pipeline.
pub fn resolve_program(program: Program) -> ParseResult<Resolver> {
    let mut resolver = Resolver::new(program)?;
    resolver.resolve()?;
    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::ast::{StatementKind, UnaryOpKind};
    use parser::{ExpressionKind, Statement};

    fn int_function(name: &str, body: Vec<Statement>) -> FunctionDefinition {
        FunctionDefinition::new(
            Token::synthetic(name),
            TypeDescriptor::int(),
            Vec::new(),
            Vec::new(),
            body,
            None,
        )
    }

    fn return_of(expression: Expression) -> Statement {
        Statement::new(
            Token::synthetic("return"),
            StatementKind::Return(Some(Box::new(expression))),
        )
    }

    #[test]
    fn duplicate_entity_names_are_rejected() {
        let mut program = Program::new();
        program.functions.push(int_function(
            "main",
            vec![return_of(Expression::integer(Token::synthetic("0"), 0))],
        ));
        program.structs.push(StructDefinition::new(
            Token::synthetic("struct"),
            Token::synthetic("main"),
            Vec::new(),
            Vec::new(),
            None,
        ));
        let err = Resolver::new(program).unwrap_err();
        assert!(err.message.contains("already an entity named 'main'"));
    }

    #[test]
    fn a_minimal_program_resolves_end_to_end() {
        let mut program = Program::new();
        let body = vec![return_of(Expression::new(
            Token::synthetic("1"),
            ExpressionKind::OpPair {
                left: Box::new(Expression::integer(Token::synthetic("1"), 1)),
                op: Token::synthetic("+"),
                right: Box::new(Expression::integer(Token::synthetic("2"), 2)),
            },
        ))];
        program.functions.push(int_function("main", body));
        let resolver = resolve_program(program).unwrap();
        let main = &resolver.functions["main"];
        match &main.body[0].kind {
            StatementKind::Return(Some(value)) => {
                assert!(matches!(value.kind, ExpressionKind::IntegerConstant(3)));
                assert!(value
                    .require_type()
                    .unwrap()
                    .is_identical(&TypeDescriptor::int()));
            }
            other => panic!("expected a folded return, got {:?}", other),
        }
    }

    #[test]
    fn unary_negation_still_folds_through_the_pipeline() {
        let mut program = Program::new();
        let body = vec![return_of(Expression::new(
            Token::synthetic("-"),
            ExpressionKind::UnaryOp {
                op: UnaryOpKind::Negative,
                operand: Box::new(Expression::integer(Token::synthetic("5"), 5)),
            },
        ))];
        program.functions.push(int_function("main", body));
        let resolver = resolve_program(program).unwrap();
        match &resolver.functions["main"].body[0].kind {
            StatementKind::Return(Some(value)) => {
                assert!(matches!(value.kind, ExpressionKind::IntegerConstant(-5)))
            }
            other => panic!("expected a folded return, got {:?}", other),
        }
    }
}
