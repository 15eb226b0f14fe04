//! The backend contract.
//!
//! A backend implements one translation method per resolved node kind and
//! per builtin operation; the provided `translate_expression` and
//! `translate_statement` methods do the dispatch. Nodes that type
//! resolution rewrites away (`OpChain`, `BracketIndex`, bare references)
//! reaching a backend is a pipeline bug and reported as such, not as a
//! user-facing diagnostic.

use std::error::Error;
use std::fmt;

use parser::ast::{ClassDefinition, CoreFunction, FunctionDefinition, StructDefinition,
    SwitchChunk, UnaryOpKind};
use parser::{Expression, ExpressionKind, Statement, StatementKind, Token, TypeCategory,
    TypeDescriptor};

use super::context::EmitContext;
use super::fragment::Fragment;

/// Failure while turning a resolved program into target-language text.
#[derive(Debug)]
pub enum GenError {
    /// The target language has no rendition of this operation.
    NotSupported { operation: String },
    /// A malformed node reached the backend; a bug upstream, not a user
    /// error.
    Internal(String),
}

impl GenError {
    pub fn not_supported(operation: impl Into<String>) -> GenError {
        GenError::NotSupported {
            operation: operation.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> GenError {
        GenError::Internal(message.into())
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::NotSupported { operation } => {
                write!(f, "This target does not support {}.", operation)
            }
            GenError::Internal(message) => write!(f, "Internal emitter error: {}", message),
        }
    }
}

impl Error for GenError {}

pub type GenResult<T> = Result<T, GenError>;

fn args_exactly<'a, const N: usize>(
    function: CoreFunction,
    args: &'a [Expression],
) -> GenResult<[&'a Expression; N]> {
    if args.len() != N {
        return Err(GenError::internal(format!(
            "Core.{} reached emission with {} argument(s) instead of {}.",
            function.name(),
            args.len(),
            N
        )));
    }
    Ok(std::array::from_fn(|i| &args[i]))
}

/// Renders type names for declarations, casts, and signatures.
pub trait TypeTranslator {
    fn translate_type(&self, descriptor: &TypeDescriptor) -> GenResult<String>;
}

/// One method per resolved expression form and builtin operation. All
/// methods receive the shared [`EmitContext`] so they can mark runtime
/// helper features while building fragments.
#[allow(unused_variables)]
pub trait ExpressionTranslator {
    fn translate_integer_constant(&self, ctx: &mut EmitContext, value: i64) -> GenResult<Fragment>;
    fn translate_float_constant(&self, ctx: &mut EmitContext, value: f64) -> GenResult<Fragment>;
    fn translate_boolean_constant(&self, ctx: &mut EmitContext, value: bool)
        -> GenResult<Fragment>;
    fn translate_char_constant(&self, ctx: &mut EmitContext, value: char) -> GenResult<Fragment>;
    fn translate_string_constant(&self, ctx: &mut EmitContext, value: &str) -> GenResult<Fragment>;
    fn translate_null_constant(&self, ctx: &mut EmitContext) -> GenResult<Fragment>;
    fn translate_variable(&self, ctx: &mut EmitContext, name: &str) -> GenResult<Fragment>;

    fn translate_op_pair(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        op: &str,
        right: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_boolean_not(
        &self,
        ctx: &mut EmitContext,
        operand: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_negative(
        &self,
        ctx: &mut EmitContext,
        operand: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_inline_increment(
        &self,
        ctx: &mut EmitContext,
        operand: &Expression,
        is_prefix: bool,
        is_addition: bool,
    ) -> GenResult<Fragment>;
    fn translate_string_concatenation(
        &self,
        ctx: &mut EmitContext,
        parts: &[Expression],
    ) -> GenResult<Fragment>;
    fn translate_cast(
        &self,
        ctx: &mut EmitContext,
        target_type: &TypeDescriptor,
        expression: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_function_invocation(
        &self,
        ctx: &mut EmitContext,
        name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment>;
    fn translate_function_reference(
        &self,
        ctx: &mut EmitContext,
        name: &str,
    ) -> GenResult<Fragment>;
    fn translate_struct_constructor(
        &self,
        ctx: &mut EmitContext,
        struct_name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment>;
    fn translate_struct_field_access(
        &self,
        ctx: &mut EmitContext,
        root: &Expression,
        struct_name: &str,
        field_name: &str,
        field_index: usize,
    ) -> GenResult<Fragment>;

    /// Class support is optional for a backend.
    fn translate_this(&self, ctx: &mut EmitContext) -> GenResult<Fragment> {
        Err(GenError::not_supported("classes"))
    }
    fn translate_class_instantiation(
        &self,
        ctx: &mut EmitContext,
        class_name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment> {
        Err(GenError::not_supported("classes"))
    }
    fn translate_method_invocation(
        &self,
        ctx: &mut EmitContext,
        instance: &Expression,
        method_name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment> {
        Err(GenError::not_supported("classes"))
    }
    fn translate_instance_field_access(
        &self,
        ctx: &mut EmitContext,
        instance: &Expression,
        field_name: &str,
    ) -> GenResult<Fragment> {
        Err(GenError::not_supported("classes"))
    }

    fn translate_array_get(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_array_join(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
        separator: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_array_length(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_array_new(
        &self,
        ctx: &mut EmitContext,
        item_type: &TypeDescriptor,
        length: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_array_set(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
        index: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_base64_to_bytes(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_base64_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_bytes_to_base64(
        &self,
        ctx: &mut EmitContext,
        bytes: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_bool_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_char_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_chr(&self, ctx: &mut EmitContext, code: &Expression) -> GenResult<Fragment>;
    fn translate_current_time_seconds(&self, ctx: &mut EmitContext) -> GenResult<Fragment>;

    fn translate_dictionary_contains_key(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_dictionary_get(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_dictionary_keys(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_dictionary_new(
        &self,
        ctx: &mut EmitContext,
        key_type: &TypeDescriptor,
        value_type: &TypeDescriptor,
    ) -> GenResult<Fragment>;
    fn translate_dictionary_remove(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_dictionary_set(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_dictionary_size(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_dictionary_values(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_emit_comment(&self, ctx: &mut EmitContext, text: &str) -> GenResult<Fragment>;

    fn translate_float_buffer_16(&self, ctx: &mut EmitContext) -> GenResult<Fragment>;
    fn translate_float_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_int_buffer_16(&self, ctx: &mut EmitContext) -> GenResult<Fragment>;
    fn translate_int_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_is_valid_integer(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_list_add(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        item: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_clear(&self, ctx: &mut EmitContext, list: &Expression)
        -> GenResult<Fragment>;
    fn translate_list_concat(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_get(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_insert(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
        item: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_join_chars(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_join_strings(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        separator: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_new(
        &self,
        ctx: &mut EmitContext,
        item_type: &TypeDescriptor,
    ) -> GenResult<Fragment>;
    fn translate_list_pop(&self, ctx: &mut EmitContext, list: &Expression) -> GenResult<Fragment>;
    fn translate_list_remove_at(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_reverse(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_set(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_shuffle(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_list_size(&self, ctx: &mut EmitContext, list: &Expression) -> GenResult<Fragment>;
    fn translate_list_to_array(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_math_abs(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment>;
    fn translate_math_arc_cos(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_math_arc_sin(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_math_arc_tan(
        &self,
        ctx: &mut EmitContext,
        y: &Expression,
        x: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_math_ceil(&self, ctx: &mut EmitContext, value: &Expression)
        -> GenResult<Fragment>;
    fn translate_math_cos(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment>;
    fn translate_math_floor(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_math_log(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment>;
    fn translate_math_pow(
        &self,
        ctx: &mut EmitContext,
        base: &Expression,
        exponent: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_math_sin(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment>;
    fn translate_math_tan(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment>;

    fn translate_multiply_list(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        count: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_ord(&self, ctx: &mut EmitContext, character: &Expression) -> GenResult<Fragment>;
    fn translate_parse_float_unsafe(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_parse_int(&self, ctx: &mut EmitContext, value: &Expression)
        -> GenResult<Fragment>;
    fn translate_print_std_err(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_print_std_out(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_random_float(&self, ctx: &mut EmitContext) -> GenResult<Fragment>;
    fn translate_sorted_copy_of_int_array(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_sorted_copy_of_string_array(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_string_append(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_buffer_16(&self, ctx: &mut EmitContext) -> GenResult<Fragment>;
    fn translate_string_builder_add(
        &self,
        ctx: &mut EmitContext,
        builder: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_builder_clear(
        &self,
        ctx: &mut EmitContext,
        builder: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_builder_new(&self, ctx: &mut EmitContext) -> GenResult<Fragment>;
    fn translate_string_builder_to_string(
        &self,
        ctx: &mut EmitContext,
        builder: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_char_at(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_char_code_at(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_compare_is_reverse(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_concat_all(
        &self,
        ctx: &mut EmitContext,
        parts: &[Expression],
    ) -> GenResult<Fragment>;
    fn translate_string_contains(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_ends_with(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        suffix: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_equals(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_from_char_code(
        &self,
        ctx: &mut EmitContext,
        code: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_index_of(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_index_of_with_start(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
        start: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_last_index_of(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_length(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_replace(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        needle: &Expression,
        replacement: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_reverse(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_split(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        separator: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_starts_with(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        prefix: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_substring(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        start: &Expression,
        length: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_substring_is_equal_to(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        start: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_to_lower(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_to_upper(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_to_utf8_bytes(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_trim(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_trim_end(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_string_trim_start(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;

    fn translate_strong_reference_equality(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_to_code_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_try_parse_float(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        out_buffer: &Expression,
    ) -> GenResult<Fragment>;
    fn translate_utf8_bytes_to_string(
        &self,
        ctx: &mut EmitContext,
        bytes: &Expression,
    ) -> GenResult<Fragment>;

    /// Dispatch one fully resolved expression to its translation method.
    fn translate_expression(
        &self,
        ctx: &mut EmitContext,
        expr: &Expression,
    ) -> GenResult<Fragment> {
        match &expr.kind {
            ExpressionKind::IntegerConstant(value) => self.translate_integer_constant(ctx, *value),
            ExpressionKind::FloatConstant(value) => self.translate_float_constant(ctx, *value),
            ExpressionKind::BooleanConstant(value) => self.translate_boolean_constant(ctx, *value),
            ExpressionKind::CharConstant(value) => self.translate_char_constant(ctx, *value),
            ExpressionKind::StringConstant(value) => self.translate_string_constant(ctx, value),
            ExpressionKind::NullConstant => self.translate_null_constant(ctx),
            ExpressionKind::Variable(name) => self.translate_variable(ctx, name),
            ExpressionKind::OpPair { left, op, right } => {
                self.translate_op_pair(ctx, left, &op.value, right)
            }
            ExpressionKind::UnaryOp { op, operand } => match op {
                UnaryOpKind::Not => self.translate_boolean_not(ctx, operand),
                UnaryOpKind::Negative => self.translate_negative(ctx, operand),
            },
            ExpressionKind::FunctionInvocation { root, args, .. } => match &root.kind {
                ExpressionKind::FunctionReference(name) => {
                    self.translate_function_invocation(ctx, name, args)
                }
                ExpressionKind::DotField {
                    root: instance,
                    field_name,
                } => self.translate_method_invocation(ctx, instance, &field_name.value, args),
                _ => Err(GenError::internal(
                    "An uninvokable call root survived type resolution.",
                )),
            },
            ExpressionKind::FunctionReference(name) => {
                self.translate_function_reference(ctx, name)
            }
            ExpressionKind::CoreFunctionInvocation { function, args } => {
                self.translate_core_invocation(ctx, expr, *function, args)
            }
            ExpressionKind::ConstructorInvocation {
                type_to_construct,
                args,
                struct_name,
            } => self.translate_construction(ctx, type_to_construct, args, struct_name.as_deref()),
            ExpressionKind::StructFieldAccess {
                root,
                struct_name,
                field_name,
                field_index,
            } => self.translate_struct_field_access(
                ctx,
                root,
                struct_name,
                &field_name.value,
                *field_index,
            ),
            ExpressionKind::DotField { root, field_name } => {
                self.translate_instance_field_access(ctx, root, &field_name.value)
            }
            ExpressionKind::Cast {
                target_type,
                expression,
            } => self.translate_cast(ctx, target_type, expression),
            ExpressionKind::This => self.translate_this(ctx),
            ExpressionKind::ForcedParenthesis(inner) => {
                Ok(self.translate_expression(ctx, inner)?.parenthesize())
            }
            ExpressionKind::InlineIncrement {
                operand,
                is_prefix,
                is_addition,
            } => self.translate_inline_increment(ctx, operand, *is_prefix, *is_addition),
            ExpressionKind::StringConcatenation(parts) => {
                self.translate_string_concatenation(ctx, parts)
            }
            ExpressionKind::OpChain { .. }
            | ExpressionKind::BracketIndex { .. }
            | ExpressionKind::CoreFunctionReference(_)
            | ExpressionKind::ConstructorReference(_)
            | ExpressionKind::EnumReference(_) => Err(GenError::internal(
                "An unresolved node survived type resolution.",
            )),
        }
    }

    fn translate_construction(
        &self,
        ctx: &mut EmitContext,
        type_to_construct: &TypeDescriptor,
        args: &[Expression],
        struct_name: Option<&str>,
    ) -> GenResult<Fragment> {
        match type_to_construct.category {
            TypeCategory::List => self.translate_list_new(ctx, &type_to_construct.generics[0]),
            TypeCategory::Array => {
                let [length] = args_exactly(CoreFunction::ArrayNew, args)?;
                self.translate_array_new(ctx, &type_to_construct.generics[0], length)
            }
            TypeCategory::Dictionary => self.translate_dictionary_new(
                ctx,
                &type_to_construct.generics[0],
                &type_to_construct.generics[1],
            ),
            TypeCategory::Primitive if type_to_construct.root == "StringBuilder" => {
                self.translate_string_builder_new(ctx)
            }
            TypeCategory::Named => match struct_name {
                Some(name) => self.translate_struct_constructor(ctx, name, args),
                None => self.translate_class_instantiation(ctx, &type_to_construct.root, args),
            },
            _ => Err(GenError::internal(format!(
                "An unconstructable type '{}' survived type resolution.",
                type_to_construct
            ))),
        }
    }

    fn translate_core_invocation(
        &self,
        ctx: &mut EmitContext,
        expr: &Expression,
        function: CoreFunction,
        args: &[Expression],
    ) -> GenResult<Fragment> {
        use CoreFunction as F;
        match function {
            F::ArrayGet => {
                let [array, index] = args_exactly(function, args)?;
                self.translate_array_get(ctx, array, index)
            }
            F::ArrayJoin => {
                let [array, separator] = args_exactly(function, args)?;
                self.translate_array_join(ctx, array, separator)
            }
            F::ArrayLength => {
                let [array] = args_exactly(function, args)?;
                self.translate_array_length(ctx, array)
            }
            F::ArrayNew => {
                let [length] = args_exactly(function, args)?;
                let object = TypeDescriptor::object();
                let item_type = expr
                    .resolved_type
                    .as_ref()
                    .and_then(|t| t.generics.first())
                    .unwrap_or(&object);
                self.translate_array_new(ctx, item_type, length)
            }
            F::ArraySet => {
                let [array, index, value] = args_exactly(function, args)?;
                self.translate_array_set(ctx, array, index, value)
            }
            F::Base64ToBytes => {
                let [value] = args_exactly(function, args)?;
                self.translate_base64_to_bytes(ctx, value)
            }
            F::Base64ToString => {
                let [value] = args_exactly(function, args)?;
                self.translate_base64_to_string(ctx, value)
            }
            F::BoolToString => {
                let [value] = args_exactly(function, args)?;
                self.translate_bool_to_string(ctx, value)
            }
            F::BytesToBase64 => {
                let [bytes] = args_exactly(function, args)?;
                self.translate_bytes_to_base64(ctx, bytes)
            }
            F::CharToString => {
                let [value] = args_exactly(function, args)?;
                self.translate_char_to_string(ctx, value)
            }
            F::Chr => {
                let [code] = args_exactly(function, args)?;
                self.translate_chr(ctx, code)
            }
            F::CurrentTimeSeconds => {
                args_exactly::<0>(function, args)?;
                self.translate_current_time_seconds(ctx)
            }
            F::DictionaryContainsKey => {
                let [dictionary, key] = args_exactly(function, args)?;
                self.translate_dictionary_contains_key(ctx, dictionary, key)
            }
            F::DictionaryGet => {
                let [dictionary, key] = args_exactly(function, args)?;
                self.translate_dictionary_get(ctx, dictionary, key)
            }
            F::DictionaryKeys => {
                let [dictionary] = args_exactly(function, args)?;
                self.translate_dictionary_keys(ctx, dictionary)
            }
            F::DictionaryNew => {
                args_exactly::<0>(function, args)?;
                let fallback =
                    TypeDescriptor::dictionary_of(TypeDescriptor::string(), TypeDescriptor::object());
                let descriptor = expr
                    .resolved_type
                    .as_ref()
                    .filter(|t| t.generics.len() == 2)
                    .unwrap_or(&fallback);
                self.translate_dictionary_new(ctx, &descriptor.generics[0], &descriptor.generics[1])
            }
            F::DictionaryRemove => {
                let [dictionary, key] = args_exactly(function, args)?;
                self.translate_dictionary_remove(ctx, dictionary, key)
            }
            F::DictionarySet => {
                let [dictionary, key, value] = args_exactly(function, args)?;
                self.translate_dictionary_set(ctx, dictionary, key, value)
            }
            F::DictionarySize => {
                let [dictionary] = args_exactly(function, args)?;
                self.translate_dictionary_size(ctx, dictionary)
            }
            F::DictionaryTryGet => Err(GenError::not_supported(
                "Core.DictionaryTryGet outside the value of a plain assignment",
            )),
            F::DictionaryValues => {
                let [dictionary] = args_exactly(function, args)?;
                self.translate_dictionary_values(ctx, dictionary)
            }
            F::EmitComment => {
                let [text] = args_exactly(function, args)?;
                match &text.kind {
                    ExpressionKind::StringConstant(value) => {
                        self.translate_emit_comment(ctx, value)
                    }
                    _ => Err(GenError::internal(
                        "Core.EmitComment requires a string literal argument.",
                    )),
                }
            }
            F::FloatBuffer16 => {
                args_exactly::<0>(function, args)?;
                self.translate_float_buffer_16(ctx)
            }
            F::FloatToString => {
                let [value] = args_exactly(function, args)?;
                self.translate_float_to_string(ctx, value)
            }
            F::IntBuffer16 => {
                args_exactly::<0>(function, args)?;
                self.translate_int_buffer_16(ctx)
            }
            F::IntToString => {
                let [value] = args_exactly(function, args)?;
                self.translate_int_to_string(ctx, value)
            }
            F::IsValidInteger => {
                let [value] = args_exactly(function, args)?;
                self.translate_is_valid_integer(ctx, value)
            }
            F::ListAdd => {
                let [list, item] = args_exactly(function, args)?;
                self.translate_list_add(ctx, list, item)
            }
            F::ListClear => {
                let [list] = args_exactly(function, args)?;
                self.translate_list_clear(ctx, list)
            }
            F::ListConcat => {
                let [left, right] = args_exactly(function, args)?;
                self.translate_list_concat(ctx, left, right)
            }
            F::ListGet => {
                let [list, index] = args_exactly(function, args)?;
                self.translate_list_get(ctx, list, index)
            }
            F::ListInsert => {
                let [list, index, item] = args_exactly(function, args)?;
                self.translate_list_insert(ctx, list, index, item)
            }
            F::ListJoinChars => {
                let [list] = args_exactly(function, args)?;
                self.translate_list_join_chars(ctx, list)
            }
            F::ListJoinStrings => {
                let [list, separator] = args_exactly(function, args)?;
                self.translate_list_join_strings(ctx, list, separator)
            }
            F::ListNew => {
                args_exactly::<0>(function, args)?;
                let object = TypeDescriptor::object();
                let item_type = expr
                    .resolved_type
                    .as_ref()
                    .and_then(|t| t.generics.first())
                    .unwrap_or(&object);
                self.translate_list_new(ctx, item_type)
            }
            F::ListPop => {
                let [list] = args_exactly(function, args)?;
                self.translate_list_pop(ctx, list)
            }
            F::ListRemoveAt => {
                let [list, index] = args_exactly(function, args)?;
                self.translate_list_remove_at(ctx, list, index)
            }
            F::ListReverse => {
                let [list] = args_exactly(function, args)?;
                self.translate_list_reverse(ctx, list)
            }
            F::ListSet => {
                let [list, index, value] = args_exactly(function, args)?;
                self.translate_list_set(ctx, list, index, value)
            }
            F::ListShuffle => {
                let [list] = args_exactly(function, args)?;
                self.translate_list_shuffle(ctx, list)
            }
            F::ListSize => {
                let [list] = args_exactly(function, args)?;
                self.translate_list_size(ctx, list)
            }
            F::ListToArray => {
                let [list] = args_exactly(function, args)?;
                self.translate_list_to_array(ctx, list)
            }
            F::MathAbs => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_abs(ctx, value)
            }
            F::MathArcCos => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_arc_cos(ctx, value)
            }
            F::MathArcSin => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_arc_sin(ctx, value)
            }
            F::MathArcTan => {
                let [y, x] = args_exactly(function, args)?;
                self.translate_math_arc_tan(ctx, y, x)
            }
            F::MathCeil => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_ceil(ctx, value)
            }
            F::MathCos => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_cos(ctx, value)
            }
            F::MathFloor => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_floor(ctx, value)
            }
            F::MathLog => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_log(ctx, value)
            }
            F::MathPow => {
                let [base, exponent] = args_exactly(function, args)?;
                self.translate_math_pow(ctx, base, exponent)
            }
            F::MathSin => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_sin(ctx, value)
            }
            F::MathTan => {
                let [value] = args_exactly(function, args)?;
                self.translate_math_tan(ctx, value)
            }
            F::MultiplyList => {
                let [list, count] = args_exactly(function, args)?;
                self.translate_multiply_list(ctx, list, count)
            }
            F::Ord => {
                let [character] = args_exactly(function, args)?;
                self.translate_ord(ctx, character)
            }
            F::ParseFloatUnsafe => {
                let [value] = args_exactly(function, args)?;
                self.translate_parse_float_unsafe(ctx, value)
            }
            F::ParseInt => {
                let [value] = args_exactly(function, args)?;
                self.translate_parse_int(ctx, value)
            }
            F::PrintStdErr => {
                let [value] = args_exactly(function, args)?;
                self.translate_print_std_err(ctx, value)
            }
            F::PrintStdOut => {
                let [value] = args_exactly(function, args)?;
                self.translate_print_std_out(ctx, value)
            }
            F::RandomFloat => {
                args_exactly::<0>(function, args)?;
                self.translate_random_float(ctx)
            }
            F::SortedCopyOfIntArray => {
                let [array] = args_exactly(function, args)?;
                self.translate_sorted_copy_of_int_array(ctx, array)
            }
            F::SortedCopyOfStringArray => {
                let [array] = args_exactly(function, args)?;
                self.translate_sorted_copy_of_string_array(ctx, array)
            }
            F::StringAppend => {
                let [left, right] = args_exactly(function, args)?;
                self.translate_string_append(ctx, left, right)
            }
            F::StringBuffer16 => {
                args_exactly::<0>(function, args)?;
                self.translate_string_buffer_16(ctx)
            }
            F::StringBuilderAdd => {
                let [builder, value] = args_exactly(function, args)?;
                self.translate_string_builder_add(ctx, builder, value)
            }
            F::StringBuilderClear => {
                let [builder] = args_exactly(function, args)?;
                self.translate_string_builder_clear(ctx, builder)
            }
            F::StringBuilderNew => {
                args_exactly::<0>(function, args)?;
                self.translate_string_builder_new(ctx)
            }
            F::StringBuilderToString => {
                let [builder] = args_exactly(function, args)?;
                self.translate_string_builder_to_string(ctx, builder)
            }
            F::StringCharAt => {
                let [value, index] = args_exactly(function, args)?;
                self.translate_string_char_at(ctx, value, index)
            }
            F::StringCharCodeAt => {
                let [value, index] = args_exactly(function, args)?;
                self.translate_string_char_code_at(ctx, value, index)
            }
            F::StringCompareIsReverse => {
                let [left, right] = args_exactly(function, args)?;
                self.translate_string_compare_is_reverse(ctx, left, right)
            }
            F::StringConcatAll => self.translate_string_concat_all(ctx, args),
            F::StringContains => {
                let [haystack, needle] = args_exactly(function, args)?;
                self.translate_string_contains(ctx, haystack, needle)
            }
            F::StringEndsWith => {
                let [value, suffix] = args_exactly(function, args)?;
                self.translate_string_ends_with(ctx, value, suffix)
            }
            F::StringEquals => {
                let [left, right] = args_exactly(function, args)?;
                self.translate_string_equals(ctx, left, right)
            }
            F::StringFromCharCode => {
                let [code] = args_exactly(function, args)?;
                self.translate_string_from_char_code(ctx, code)
            }
            F::StringIndexOf => {
                let [haystack, needle] = args_exactly(function, args)?;
                self.translate_string_index_of(ctx, haystack, needle)
            }
            F::StringIndexOfWithStart => {
                let [haystack, needle, start] = args_exactly(function, args)?;
                self.translate_string_index_of_with_start(ctx, haystack, needle, start)
            }
            F::StringLastIndexOf => {
                let [haystack, needle] = args_exactly(function, args)?;
                self.translate_string_last_index_of(ctx, haystack, needle)
            }
            F::StringLength => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_length(ctx, value)
            }
            F::StringReplace => {
                let [value, needle, replacement] = args_exactly(function, args)?;
                self.translate_string_replace(ctx, value, needle, replacement)
            }
            F::StringReverse => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_reverse(ctx, value)
            }
            F::StringSplit => {
                let [value, separator] = args_exactly(function, args)?;
                self.translate_string_split(ctx, value, separator)
            }
            F::StringStartsWith => {
                let [value, prefix] = args_exactly(function, args)?;
                self.translate_string_starts_with(ctx, value, prefix)
            }
            F::StringSubstring => {
                let [value, start, length] = args_exactly(function, args)?;
                self.translate_string_substring(ctx, value, start, length)
            }
            F::StringSubstringIsEqualTo => {
                let [value, start, needle] = args_exactly(function, args)?;
                self.translate_string_substring_is_equal_to(ctx, value, start, needle)
            }
            F::StringToLower => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_to_lower(ctx, value)
            }
            F::StringToUpper => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_to_upper(ctx, value)
            }
            F::StringToUtf8Bytes => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_to_utf8_bytes(ctx, value)
            }
            F::StringTrim => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_trim(ctx, value)
            }
            F::StringTrimEnd => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_trim_end(ctx, value)
            }
            F::StringTrimStart => {
                let [value] = args_exactly(function, args)?;
                self.translate_string_trim_start(ctx, value)
            }
            F::StrongReferenceEquality => {
                let [left, right] = args_exactly(function, args)?;
                self.translate_strong_reference_equality(ctx, left, right)
            }
            F::ToCodeString => {
                let [value] = args_exactly(function, args)?;
                self.translate_to_code_string(ctx, value)
            }
            F::TryParseFloat => {
                let [value, out_buffer] = args_exactly(function, args)?;
                self.translate_try_parse_float(ctx, value, out_buffer)
            }
            F::Utf8BytesToString => {
                let [bytes] = args_exactly(function, args)?;
                self.translate_utf8_bytes_to_string(ctx, bytes)
            }
        }
    }
}

/// Statement and declaration emission. Methods write complete lines into
/// the context at the current indentation.
pub trait StatementTranslator: ExpressionTranslator + TypeTranslator {
    fn translate_assignment(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        op: &Token,
        value: &Expression,
    ) -> GenResult<()>;
    fn translate_break(&self, ctx: &mut EmitContext) -> GenResult<()>;
    fn translate_expression_as_statement(
        &self,
        ctx: &mut EmitContext,
        expression: &Expression,
    ) -> GenResult<()>;
    fn translate_if(
        &self,
        ctx: &mut EmitContext,
        condition: &Expression,
        if_code: &[Statement],
        else_code: &[Statement],
    ) -> GenResult<()>;
    fn translate_return(
        &self,
        ctx: &mut EmitContext,
        value: Option<&Expression>,
    ) -> GenResult<()>;
    fn translate_switch(
        &self,
        ctx: &mut EmitContext,
        condition: &Expression,
        chunks: &[SwitchChunk],
    ) -> GenResult<()>;
    fn translate_variable_declaration(
        &self,
        ctx: &mut EmitContext,
        declared_type: &TypeDescriptor,
        name: &str,
        value: &Expression,
    ) -> GenResult<()>;
    fn translate_while(
        &self,
        ctx: &mut EmitContext,
        condition: &Expression,
        code: &[Statement],
    ) -> GenResult<()>;

    /// `target = Core.DictionaryTryGet(dict, key, fallback);` is the one
    /// builtin that must see its assignment target, since most languages
    /// render it as a guarded lookup rather than an expression.
    fn translate_dictionary_try_get(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        dictionary: &Expression,
        key: &Expression,
        fallback: &Expression,
    ) -> GenResult<()>;

    fn generate_function(
        &self,
        ctx: &mut EmitContext,
        function: &FunctionDefinition,
    ) -> GenResult<()>;
    fn generate_struct(
        &self,
        ctx: &mut EmitContext,
        definition: &StructDefinition,
    ) -> GenResult<()>;

    /// Class emission is optional for a backend.
    #[allow(unused_variables)]
    fn generate_class(
        &self,
        ctx: &mut EmitContext,
        definition: &ClassDefinition,
    ) -> GenResult<()> {
        Err(GenError::not_supported("classes"))
    }

    fn translate_statement(&self, ctx: &mut EmitContext, stmt: &Statement) -> GenResult<()> {
        match &stmt.kind {
            StatementKind::Assignment {
                target,
                op_token,
                value,
            } => {
                if let ExpressionKind::CoreFunctionInvocation {
                    function: CoreFunction::DictionaryTryGet,
                    args,
                } = &value.kind
                {
                    if op_token.value == "=" {
                        let [dictionary, key, fallback] =
                            args_exactly(CoreFunction::DictionaryTryGet, args)?;
                        return self
                            .translate_dictionary_try_get(ctx, target, dictionary, key, fallback);
                    }
                }
                self.translate_assignment(ctx, target, op_token, value)
            }
            StatementKind::Break => self.translate_break(ctx),
            StatementKind::ExpressionAsStatement(expression) => {
                self.translate_expression_as_statement(ctx, expression)
            }
            StatementKind::If {
                condition,
                if_code,
                else_code,
            } => self.translate_if(ctx, condition, if_code, else_code),
            StatementKind::Return(value) => self.translate_return(ctx, value.as_deref()),
            StatementKind::Switch { condition, chunks } => {
                self.translate_switch(ctx, condition, chunks)
            }
            StatementKind::VariableDeclaration {
                declared_type,
                name_token,
                value,
            } => {
                let value = value.as_deref().ok_or_else(|| {
                    GenError::internal("A valueless declaration survived resolution.")
                })?;
                self.translate_variable_declaration(ctx, declared_type, &name_token.value, value)
            }
            StatementKind::While { condition, code } => self.translate_while(ctx, condition, code),
            StatementKind::StatementBatch(statements) => self.translate_statements(ctx, statements),
        }
    }

    fn translate_statements(
        &self,
        ctx: &mut EmitContext,
        statements: &[Statement],
    ) -> GenResult<()> {
        for stmt in statements {
            self.translate_statement(ctx, stmt)?;
        }
        Ok(())
    }
}
