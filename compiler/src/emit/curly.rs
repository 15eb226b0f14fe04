//! The curly-brace reference backend.
//!
//! A C#-flavored target used by the integration tests and the demo
//! subcommand. Operations the target's standard library covers map onto
//! it directly; the rest call prefixed runtime helpers and mark the
//! matching feature so an exporter can prepend only the helpers the
//! output needs.

use parser::ast::{CoreFunction, FunctionDefinition, StructDefinition, SwitchChunk};
use parser::{Expression, ExpressionKind, Statement, StatementKind, Token, TypeCategory,
    TypeDescriptor};
use smallvec::SmallVec;

use super::context::EmitContext;
use super::fragment::{Fragment, Tightness};
use super::translator::{ExpressionTranslator, GenError, GenResult, StatementTranslator,
    TypeTranslator};

/// Binding strength of a binary operator in a curly-brace grammar.
pub fn op_tightness(op: &str) -> Tightness {
    match op {
        "*" | "/" | "%" => Tightness::Multiplication,
        "+" | "-" => Tightness::Addition,
        "<<" | ">>" => Tightness::Bitshift,
        "<" | "<=" | ">" | ">=" => Tightness::Inequality,
        "==" | "!=" => Tightness::Equality,
        "&" | "|" | "^" => Tightness::Bitwise,
        "&&" | "||" => Tightness::BooleanLogic,
        _ => Tightness::Unknown,
    }
}

/// Shared infix rendering: the left child may tie the operator's
/// tightness, the right child must exceed it so the output re-parses with
/// the same left-leaning shape.
pub fn binary_op_fragment<B>(
    backend: &B,
    ctx: &mut EmitContext,
    left: &Expression,
    op: &str,
    right: &Expression,
) -> GenResult<Fragment>
where
    B: ExpressionTranslator + ?Sized,
{
    let tightness = op_tightness(op);
    let lhs = backend
        .translate_expression(ctx, left)?
        .ensure_tightness(tightness);
    let rhs = backend
        .translate_expression(ctx, right)?
        .ensure_greater_tightness(tightness);
    Ok(lhs.push(format!(" {} ", op)).push(rhs).with_tightness(tightness))
}

fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn escape_char(value: char) -> String {
    match value {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\0' => "'\\0'".to_string(),
        _ => format!("'{}'", value),
    }
}

fn ends_with_jump(statements: &[Statement]) -> bool {
    matches!(
        statements.last().map(|s| &s.kind),
        Some(StatementKind::Return(_)) | Some(StatementKind::Break)
    )
}

pub struct CurlyBraceBackend;

impl CurlyBraceBackend {
    pub fn new() -> Self {
        CurlyBraceBackend
    }

    fn arg_list(&self, ctx: &mut EmitContext, args: &[&Expression]) -> GenResult<Fragment> {
        let mut rendered: SmallVec<[Fragment; 4]> = SmallVec::new();
        for arg in args {
            rendered.push(self.translate_expression(ctx, arg)?);
        }
        let mut out = Fragment::of("(");
        for (i, frag) in rendered.into_iter().enumerate() {
            if i > 0 {
                out = out.push(", ");
            }
            out = out.push(frag);
        }
        Ok(out.push(")"))
    }

    fn plain_call(
        &self,
        ctx: &mut EmitContext,
        name: &str,
        args: &[&Expression],
    ) -> GenResult<Fragment> {
        let args = self.arg_list(ctx, args)?;
        Ok(Fragment::of(name)
            .push(args)
            .with_tightness(Tightness::SuffixSequence))
    }

    /// Call into a prefixed runtime helper and record the dependency.
    fn runtime_call(
        &self,
        ctx: &mut EmitContext,
        feature: &str,
        args: &[&Expression],
    ) -> GenResult<Fragment> {
        ctx.mark_feature(feature);
        let name = format!("{}{}", ctx.unique_prefix(), feature);
        self.plain_call(ctx, &name, args)
    }

    /// A runtime value that is a named slot rather than a call, like the
    /// scratch buffers.
    fn runtime_slot(&self, ctx: &mut EmitContext, feature: &str) -> GenResult<Fragment> {
        ctx.mark_feature(feature);
        Ok(Fragment::atom(format!("{}{}", ctx.unique_prefix(), feature)))
    }

    fn method_call(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        method: &str,
        args: &[&Expression],
    ) -> GenResult<Fragment> {
        let root = self
            .translate_expression(ctx, target)?
            .ensure_tightness(Tightness::SuffixSequence);
        let args = self.arg_list(ctx, args)?;
        Ok(root
            .push(".")
            .push(method)
            .push(args)
            .with_tightness(Tightness::SuffixSequence))
    }

    fn property(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        name: &str,
    ) -> GenResult<Fragment> {
        let root = self
            .translate_expression(ctx, target)?
            .ensure_tightness(Tightness::SuffixSequence);
        Ok(root
            .push(".")
            .push(name)
            .with_tightness(Tightness::SuffixSequence))
    }

    fn index(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment> {
        let root = self
            .translate_expression(ctx, target)?
            .ensure_tightness(Tightness::SuffixSequence);
        let index = self.translate_expression(ctx, index)?;
        Ok(root
            .push("[")
            .push(index)
            .push("]")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn index_assign(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        index: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment> {
        let slot = self.index(ctx, target, index)?;
        let value = self.translate_expression(ctx, value)?;
        Ok(slot.push(" = ").push(value))
    }

    fn prefix_cast(
        &self,
        ctx: &mut EmitContext,
        type_name: &str,
        operand: &Expression,
    ) -> GenResult<Fragment> {
        let operand = self
            .translate_expression(ctx, operand)?
            .ensure_tightness(Tightness::UnaryPrefix);
        Ok(Fragment::of(format!("({})", type_name))
            .push(operand)
            .with_tightness(Tightness::UnaryPrefix))
    }

    fn write_block(&self, ctx: &mut EmitContext, code: &[Statement]) -> GenResult<()> {
        ctx.append(" {\n");
        ctx.indent();
        self.translate_statements(ctx, code)?;
        ctx.dedent();
        ctx.append_tab();
        Ok(())
    }

    fn write_if(
        &self,
        ctx: &mut EmitContext,
        condition: &Expression,
        if_code: &[Statement],
        else_code: &[Statement],
        leading_tab: bool,
    ) -> GenResult<()> {
        if leading_tab {
            ctx.append_tab();
        }
        ctx.append("if (");
        let condition = self.translate_expression(ctx, condition)?;
        ctx.append_fragment(&condition);
        ctx.append(")");
        self.write_block(ctx, if_code)?;
        if else_code.is_empty() {
            ctx.append("}\n");
            return Ok(());
        }
        // Collapse a lone nested if in the else branch into `else if`.
        if else_code.len() == 1 {
            if let StatementKind::If {
                condition,
                if_code,
                else_code,
            } = &else_code[0].kind
            {
                ctx.append("} else ");
                return self.write_if(ctx, condition, if_code, else_code, false);
            }
        }
        ctx.append("} else");
        self.write_block(ctx, else_code)?;
        ctx.append("}\n");
        Ok(())
    }
}

impl Default for CurlyBraceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTranslator for CurlyBraceBackend {
    fn translate_type(&self, descriptor: &TypeDescriptor) -> GenResult<String> {
        match descriptor.category {
            TypeCategory::Void => Ok("void".to_string()),
            TypeCategory::Object => Ok("object".to_string()),
            TypeCategory::Primitive => Ok(match descriptor.root.as_str() {
                "number" => "double".to_string(),
                "StringBuilder" => "System.Text.StringBuilder".to_string(),
                other => other.to_string(),
            }),
            TypeCategory::List => Ok(format!(
                "List<{}>",
                self.translate_type(&descriptor.generics[0])?
            )),
            TypeCategory::Array => Ok(format!(
                "{}[]",
                self.translate_type(&descriptor.generics[0])?
            )),
            TypeCategory::Dictionary => Ok(format!(
                "Dictionary<{}, {}>",
                self.translate_type(&descriptor.generics[0])?,
                self.translate_type(&descriptor.generics[1])?
            )),
            TypeCategory::Function => {
                // Source order is return-first; the target wants it last.
                let return_type = &descriptor.generics[0];
                let mut parts: Vec<String> = Vec::new();
                for arg in &descriptor.generics[1..] {
                    parts.push(self.translate_type(arg)?);
                }
                if return_type.category == TypeCategory::Void {
                    if parts.is_empty() {
                        return Ok("Action".to_string());
                    }
                    return Ok(format!("Action<{}>", parts.join(", ")));
                }
                parts.push(self.translate_type(return_type)?);
                Ok(format!("Func<{}>", parts.join(", ")))
            }
            TypeCategory::Named => Ok(descriptor.root.clone()),
            TypeCategory::Null | TypeCategory::Template => Err(GenError::internal(format!(
                "The type '{}' has no declarable rendition.",
                descriptor
            ))),
        }
    }
}

impl ExpressionTranslator for CurlyBraceBackend {
    fn translate_integer_constant(&self, _ctx: &mut EmitContext, value: i64) -> GenResult<Fragment> {
        let tightness = if value < 0 {
            Tightness::UnaryPrefix
        } else {
            Tightness::Atomic
        };
        Ok(Fragment::of(value.to_string()).with_tightness(tightness))
    }

    fn translate_float_constant(&self, _ctx: &mut EmitContext, value: f64) -> GenResult<Fragment> {
        let mut text = value.to_string();
        if !text.contains('.') && !text.contains('e') && !text.contains("inf") {
            text.push_str(".0");
        }
        let tightness = if value < 0.0 {
            Tightness::UnaryPrefix
        } else {
            Tightness::Atomic
        };
        Ok(Fragment::of(text).with_tightness(tightness))
    }

    fn translate_boolean_constant(
        &self,
        _ctx: &mut EmitContext,
        value: bool,
    ) -> GenResult<Fragment> {
        Ok(Fragment::atom(if value { "true" } else { "false" }))
    }

    fn translate_char_constant(&self, _ctx: &mut EmitContext, value: char) -> GenResult<Fragment> {
        Ok(Fragment::atom(escape_char(value)))
    }

    fn translate_string_constant(
        &self,
        _ctx: &mut EmitContext,
        value: &str,
    ) -> GenResult<Fragment> {
        Ok(Fragment::atom(escape_string(value)))
    }

    fn translate_null_constant(&self, _ctx: &mut EmitContext) -> GenResult<Fragment> {
        Ok(Fragment::atom("null"))
    }

    fn translate_variable(&self, _ctx: &mut EmitContext, name: &str) -> GenResult<Fragment> {
        Ok(Fragment::atom(name))
    }

    fn translate_op_pair(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        op: &str,
        right: &Expression,
    ) -> GenResult<Fragment> {
        binary_op_fragment(self, ctx, left, op, right)
    }

    fn translate_boolean_not(
        &self,
        ctx: &mut EmitContext,
        operand: &Expression,
    ) -> GenResult<Fragment> {
        let operand = self
            .translate_expression(ctx, operand)?
            .ensure_tightness(Tightness::UnaryPrefix);
        Ok(Fragment::of("!")
            .push(operand)
            .with_tightness(Tightness::UnaryPrefix))
    }

    fn translate_negative(
        &self,
        ctx: &mut EmitContext,
        operand: &Expression,
    ) -> GenResult<Fragment> {
        let operand = self
            .translate_expression(ctx, operand)?
            .ensure_tightness(Tightness::UnaryPrefix);
        Ok(Fragment::of("-")
            .push(operand)
            .with_tightness(Tightness::UnaryPrefix))
    }

    fn translate_inline_increment(
        &self,
        ctx: &mut EmitContext,
        operand: &Expression,
        is_prefix: bool,
        is_addition: bool,
    ) -> GenResult<Fragment> {
        let op = if is_addition { "++" } else { "--" };
        let operand = self
            .translate_expression(ctx, operand)?
            .ensure_tightness(Tightness::UnarySuffix);
        Ok(if is_prefix {
            operand
                .prepend(op)
                .with_tightness(Tightness::UnaryPrefix)
        } else {
            operand.push(op).with_tightness(Tightness::UnarySuffix)
        })
    }

    fn translate_string_concatenation(
        &self,
        ctx: &mut EmitContext,
        parts: &[Expression],
    ) -> GenResult<Fragment> {
        self.translate_string_concat_all(ctx, parts)
    }

    fn translate_cast(
        &self,
        ctx: &mut EmitContext,
        target_type: &TypeDescriptor,
        expression: &Expression,
    ) -> GenResult<Fragment> {
        let type_name = self.translate_type(target_type)?;
        self.prefix_cast(ctx, &type_name, expression)
    }

    fn translate_function_invocation(
        &self,
        ctx: &mut EmitContext,
        name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment> {
        let args: Vec<&Expression> = args.iter().collect();
        self.plain_call(ctx, name, &args)
    }

    fn translate_function_reference(
        &self,
        _ctx: &mut EmitContext,
        name: &str,
    ) -> GenResult<Fragment> {
        Ok(Fragment::atom(name))
    }

    fn translate_struct_constructor(
        &self,
        ctx: &mut EmitContext,
        struct_name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment> {
        let args: Vec<&Expression> = args.iter().collect();
        let args = self.arg_list(ctx, &args)?;
        Ok(Fragment::of(format!("new {}", struct_name))
            .push(args)
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_struct_field_access(
        &self,
        ctx: &mut EmitContext,
        root: &Expression,
        _struct_name: &str,
        field_name: &str,
        _field_index: usize,
    ) -> GenResult<Fragment> {
        self.property(ctx, root, field_name)
    }

    fn translate_this(&self, _ctx: &mut EmitContext) -> GenResult<Fragment> {
        Ok(Fragment::atom("this"))
    }

    fn translate_class_instantiation(
        &self,
        ctx: &mut EmitContext,
        class_name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment> {
        self.translate_struct_constructor(ctx, class_name, args)
    }

    fn translate_method_invocation(
        &self,
        ctx: &mut EmitContext,
        instance: &Expression,
        method_name: &str,
        args: &[Expression],
    ) -> GenResult<Fragment> {
        let args: Vec<&Expression> = args.iter().collect();
        self.method_call(ctx, instance, method_name, &args)
    }

    fn translate_instance_field_access(
        &self,
        ctx: &mut EmitContext,
        instance: &Expression,
        field_name: &str,
    ) -> GenResult<Fragment> {
        self.property(ctx, instance, field_name)
    }

    fn translate_array_get(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment> {
        self.index(ctx, array, index)
    }

    fn translate_array_join(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
        separator: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "string.Join", &[separator, array])
    }

    fn translate_array_length(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
    ) -> GenResult<Fragment> {
        self.property(ctx, array, "Length")
    }

    fn translate_array_new(
        &self,
        ctx: &mut EmitContext,
        item_type: &TypeDescriptor,
        length: &Expression,
    ) -> GenResult<Fragment> {
        let type_name = self.translate_type(item_type)?;
        let length = self.translate_expression(ctx, length)?;
        Ok(Fragment::of(format!("new {}[", type_name))
            .push(length)
            .push("]")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_array_set(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
        index: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.index_assign(ctx, array, index, value)
    }

    fn translate_base64_to_bytes(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "Base64ToBytes", &[value])
    }

    fn translate_base64_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "Base64ToString", &[value])
    }

    fn translate_bytes_to_base64(
        &self,
        ctx: &mut EmitContext,
        bytes: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "BytesToBase64", &[bytes])
    }

    fn translate_bool_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "BoolToString", &[value])
    }

    fn translate_char_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "ToString", &[])
    }

    fn translate_chr(&self, ctx: &mut EmitContext, code: &Expression) -> GenResult<Fragment> {
        self.prefix_cast(ctx, "char", code)
    }

    fn translate_current_time_seconds(&self, ctx: &mut EmitContext) -> GenResult<Fragment> {
        self.runtime_call(ctx, "CurrentTimeSeconds", &[])
    }

    fn translate_dictionary_contains_key(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, dictionary, "ContainsKey", &[key])
    }

    fn translate_dictionary_get(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
    ) -> GenResult<Fragment> {
        self.index(ctx, dictionary, key)
    }

    fn translate_dictionary_keys(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
    ) -> GenResult<Fragment> {
        let keys = self.property(ctx, dictionary, "Keys")?;
        Ok(keys
            .push(".ToArray()")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_dictionary_new(
        &self,
        _ctx: &mut EmitContext,
        key_type: &TypeDescriptor,
        value_type: &TypeDescriptor,
    ) -> GenResult<Fragment> {
        Ok(Fragment::of(format!(
            "new Dictionary<{}, {}>()",
            self.translate_type(key_type)?,
            self.translate_type(value_type)?
        ))
        .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_dictionary_remove(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, dictionary, "Remove", &[key])
    }

    fn translate_dictionary_set(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
        key: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.index_assign(ctx, dictionary, key, value)
    }

    fn translate_dictionary_size(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
    ) -> GenResult<Fragment> {
        self.property(ctx, dictionary, "Count")
    }

    fn translate_dictionary_values(
        &self,
        ctx: &mut EmitContext,
        dictionary: &Expression,
    ) -> GenResult<Fragment> {
        let values = self.property(ctx, dictionary, "Values")?;
        Ok(values
            .push(".ToArray()")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_emit_comment(&self, _ctx: &mut EmitContext, _text: &str) -> GenResult<Fragment> {
        Err(GenError::not_supported("comments in expression position"))
    }

    fn translate_float_buffer_16(&self, ctx: &mut EmitContext) -> GenResult<Fragment> {
        self.runtime_slot(ctx, "FloatBuffer16")
    }

    fn translate_float_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "FloatToString", &[value])
    }

    fn translate_int_buffer_16(&self, ctx: &mut EmitContext) -> GenResult<Fragment> {
        self.runtime_slot(ctx, "IntBuffer16")
    }

    fn translate_int_to_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "ToString", &[])
    }

    fn translate_is_valid_integer(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "IsValidInteger", &[value])
    }

    fn translate_list_add(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        item: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, list, "Add", &[item])
    }

    fn translate_list_clear(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, list, "Clear", &[])
    }

    fn translate_list_concat(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment> {
        let joined = self.method_call(ctx, left, "Concat", &[right])?;
        Ok(joined
            .push(".ToList()")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_list_get(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment> {
        self.index(ctx, list, index)
    }

    fn translate_list_insert(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
        item: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, list, "Insert", &[index, item])
    }

    fn translate_list_join_chars(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment> {
        let chars = self
            .translate_expression(ctx, list)?
            .ensure_tightness(Tightness::SuffixSequence);
        Ok(Fragment::of("new string(")
            .push(chars)
            .push(".ToArray())")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_list_join_strings(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        separator: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "string.Join", &[separator, list])
    }

    fn translate_list_new(
        &self,
        _ctx: &mut EmitContext,
        item_type: &TypeDescriptor,
    ) -> GenResult<Fragment> {
        Ok(
            Fragment::of(format!("new List<{}>()", self.translate_type(item_type)?))
                .with_tightness(Tightness::SuffixSequence),
        )
    }

    fn translate_list_pop(&self, ctx: &mut EmitContext, list: &Expression) -> GenResult<Fragment> {
        self.runtime_call(ctx, "ListPop", &[list])
    }

    fn translate_list_remove_at(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, list, "RemoveAt", &[index])
    }

    fn translate_list_reverse(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, list, "Reverse", &[])
    }

    fn translate_list_set(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        index: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.index_assign(ctx, list, index, value)
    }

    fn translate_list_shuffle(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "ListShuffle", &[list])
    }

    fn translate_list_size(&self, ctx: &mut EmitContext, list: &Expression) -> GenResult<Fragment> {
        self.property(ctx, list, "Count")
    }

    fn translate_list_to_array(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, list, "ToArray", &[])
    }

    fn translate_math_abs(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Abs", &[value])
    }

    fn translate_math_arc_cos(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Acos", &[value])
    }

    fn translate_math_arc_sin(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Asin", &[value])
    }

    fn translate_math_arc_tan(
        &self,
        ctx: &mut EmitContext,
        y: &Expression,
        x: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Atan2", &[y, x])
    }

    fn translate_math_ceil(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        let call = self.plain_call(ctx, "Math.Ceiling", &[value])?;
        Ok(Fragment::of("(int)")
            .push(call)
            .with_tightness(Tightness::UnaryPrefix))
    }

    fn translate_math_cos(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Cos", &[value])
    }

    fn translate_math_floor(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        let call = self.plain_call(ctx, "Math.Floor", &[value])?;
        Ok(Fragment::of("(int)")
            .push(call)
            .with_tightness(Tightness::UnaryPrefix))
    }

    fn translate_math_log(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Log", &[value])
    }

    fn translate_math_pow(
        &self,
        ctx: &mut EmitContext,
        base: &Expression,
        exponent: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Pow", &[base, exponent])
    }

    fn translate_math_sin(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Sin", &[value])
    }

    fn translate_math_tan(&self, ctx: &mut EmitContext, value: &Expression) -> GenResult<Fragment> {
        self.plain_call(ctx, "Math.Tan", &[value])
    }

    fn translate_multiply_list(
        &self,
        ctx: &mut EmitContext,
        list: &Expression,
        count: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "MultiplyList", &[list, count])
    }

    fn translate_ord(&self, ctx: &mut EmitContext, character: &Expression) -> GenResult<Fragment> {
        self.prefix_cast(ctx, "int", character)
    }

    fn translate_parse_float_unsafe(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "double.Parse", &[value])
    }

    fn translate_parse_int(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "int.Parse", &[value])
    }

    fn translate_print_std_err(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "Console.Error.WriteLine", &[value])
    }

    fn translate_print_std_out(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "Console.WriteLine", &[value])
    }

    fn translate_random_float(&self, ctx: &mut EmitContext) -> GenResult<Fragment> {
        self.runtime_call(ctx, "RandomFloat", &[])
    }

    fn translate_sorted_copy_of_int_array(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "SortedCopyOfIntArray", &[array])
    }

    fn translate_sorted_copy_of_string_array(
        &self,
        ctx: &mut EmitContext,
        array: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "SortedCopyOfStringArray", &[array])
    }

    fn translate_string_append(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment> {
        binary_op_fragment(self, ctx, left, "+", right)
    }

    fn translate_string_buffer_16(&self, ctx: &mut EmitContext) -> GenResult<Fragment> {
        self.runtime_slot(ctx, "StringBuffer16")
    }

    fn translate_string_builder_add(
        &self,
        ctx: &mut EmitContext,
        builder: &Expression,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, builder, "Append", &[value])
    }

    fn translate_string_builder_clear(
        &self,
        ctx: &mut EmitContext,
        builder: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, builder, "Clear", &[])
    }

    fn translate_string_builder_new(&self, _ctx: &mut EmitContext) -> GenResult<Fragment> {
        Ok(Fragment::of("new System.Text.StringBuilder()")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_string_builder_to_string(
        &self,
        ctx: &mut EmitContext,
        builder: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, builder, "ToString", &[])
    }

    fn translate_string_char_at(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment> {
        self.index(ctx, value, index)
    }

    fn translate_string_char_code_at(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        index: &Expression,
    ) -> GenResult<Fragment> {
        let indexed = self.index(ctx, value, index)?;
        Ok(Fragment::of("(int)")
            .push(indexed)
            .with_tightness(Tightness::UnaryPrefix))
    }

    fn translate_string_compare_is_reverse(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "StringCompareIsReverse", &[left, right])
    }

    fn translate_string_concat_all(
        &self,
        ctx: &mut EmitContext,
        parts: &[Expression],
    ) -> GenResult<Fragment> {
        let mut out: Option<Fragment> = None;
        for part in parts {
            let rendered = self
                .translate_expression(ctx, part)?
                .ensure_tightness(Tightness::Addition);
            out = Some(match out {
                None => rendered,
                Some(acc) => acc.push(" + ").push(rendered),
            });
        }
        Ok(out
            .map(|frag| frag.with_tightness(Tightness::Addition))
            .unwrap_or_else(|| Fragment::atom("\"\"")))
    }

    fn translate_string_contains(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, haystack, "Contains", &[needle])
    }

    fn translate_string_ends_with(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        suffix: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "EndsWith", &[suffix])
    }

    fn translate_string_equals(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment> {
        binary_op_fragment(self, ctx, left, "==", right)
    }

    fn translate_string_from_char_code(
        &self,
        ctx: &mut EmitContext,
        code: &Expression,
    ) -> GenResult<Fragment> {
        let cast = self
            .prefix_cast(ctx, "char", code)?
            .ensure_tightness(Tightness::SuffixSequence);
        Ok(cast
            .push(".ToString()")
            .with_tightness(Tightness::SuffixSequence))
    }

    fn translate_string_index_of(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, haystack, "IndexOf", &[needle])
    }

    fn translate_string_index_of_with_start(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
        start: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, haystack, "IndexOf", &[needle, start])
    }

    fn translate_string_last_index_of(
        &self,
        ctx: &mut EmitContext,
        haystack: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, haystack, "LastIndexOf", &[needle])
    }

    fn translate_string_length(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.property(ctx, value, "Length")
    }

    fn translate_string_replace(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        needle: &Expression,
        replacement: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "Replace", &[needle, replacement])
    }

    fn translate_string_reverse(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "StringReverse", &[value])
    }

    fn translate_string_split(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        separator: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "StringSplit", &[value, separator])
    }

    fn translate_string_starts_with(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        prefix: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "StartsWith", &[prefix])
    }

    fn translate_string_substring(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        start: &Expression,
        length: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "Substring", &[start, length])
    }

    fn translate_string_substring_is_equal_to(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        start: &Expression,
        needle: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "SubstringIsEqualTo", &[value, start, needle])
    }

    fn translate_string_to_lower(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "ToLower", &[])
    }

    fn translate_string_to_upper(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "ToUpper", &[])
    }

    fn translate_string_to_utf8_bytes(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "StringToUtf8Bytes", &[value])
    }

    fn translate_string_trim(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "Trim", &[])
    }

    fn translate_string_trim_end(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "TrimEnd", &[])
    }

    fn translate_string_trim_start(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.method_call(ctx, value, "TrimStart", &[])
    }

    fn translate_strong_reference_equality(
        &self,
        ctx: &mut EmitContext,
        left: &Expression,
        right: &Expression,
    ) -> GenResult<Fragment> {
        self.plain_call(ctx, "object.ReferenceEquals", &[left, right])
    }

    fn translate_to_code_string(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "ToCodeString", &[value])
    }

    fn translate_try_parse_float(
        &self,
        ctx: &mut EmitContext,
        value: &Expression,
        out_buffer: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "TryParseFloat", &[value, out_buffer])
    }

    fn translate_utf8_bytes_to_string(
        &self,
        ctx: &mut EmitContext,
        bytes: &Expression,
    ) -> GenResult<Fragment> {
        self.runtime_call(ctx, "Utf8BytesToString", &[bytes])
    }
}

impl StatementTranslator for CurlyBraceBackend {
    fn translate_assignment(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        op: &Token,
        value: &Expression,
    ) -> GenResult<()> {
        let target = self.translate_expression(ctx, target)?;
        let value = self.translate_expression(ctx, value)?;
        ctx.append_tab();
        ctx.append_fragment(&target);
        ctx.append(" ");
        ctx.append(&op.value);
        ctx.append(" ");
        ctx.append_fragment(&value);
        ctx.append(";\n");
        Ok(())
    }

    fn translate_break(&self, ctx: &mut EmitContext) -> GenResult<()> {
        ctx.append_tab();
        ctx.append("break;\n");
        Ok(())
    }

    fn translate_expression_as_statement(
        &self,
        ctx: &mut EmitContext,
        expression: &Expression,
    ) -> GenResult<()> {
        // Comments are the one expression-statement without a semicolon.
        if let ExpressionKind::CoreFunctionInvocation {
            function: CoreFunction::EmitComment,
            args,
        } = &expression.kind
        {
            if let Some(ExpressionKind::StringConstant(text)) = args.first().map(|a| &a.kind) {
                ctx.append_tab();
                ctx.append("// ");
                ctx.append(text);
                ctx.append("\n");
                return Ok(());
            }
        }
        let rendered = self.translate_expression(ctx, expression)?;
        ctx.append_tab();
        ctx.append_fragment(&rendered);
        ctx.append(";\n");
        Ok(())
    }

    fn translate_if(
        &self,
        ctx: &mut EmitContext,
        condition: &Expression,
        if_code: &[Statement],
        else_code: &[Statement],
    ) -> GenResult<()> {
        self.write_if(ctx, condition, if_code, else_code, true)
    }

    fn translate_return(
        &self,
        ctx: &mut EmitContext,
        value: Option<&Expression>,
    ) -> GenResult<()> {
        ctx.append_tab();
        match value {
            Some(value) => {
                let rendered = self.translate_expression(ctx, value)?;
                ctx.append("return ");
                ctx.append_fragment(&rendered);
                ctx.append(";\n");
            }
            None => ctx.append("return;\n"),
        }
        Ok(())
    }

    fn translate_switch(
        &self,
        ctx: &mut EmitContext,
        condition: &Expression,
        chunks: &[SwitchChunk],
    ) -> GenResult<()> {
        let condition = self.translate_expression(ctx, condition)?;
        ctx.append_tab();
        ctx.append("switch (");
        ctx.append_fragment(&condition);
        ctx.append(") {\n");
        ctx.indent();
        for chunk in chunks {
            for case in &chunk.cases {
                ctx.append_tab();
                match case {
                    Some(value) => {
                        let rendered = self.translate_expression(ctx, value)?;
                        ctx.append("case ");
                        ctx.append_fragment(&rendered);
                        ctx.append(":\n");
                    }
                    None => ctx.append("default:\n"),
                }
            }
            ctx.indent();
            self.translate_statements(ctx, &chunk.code)?;
            if !ends_with_jump(&chunk.code) {
                ctx.append_tab();
                ctx.append("break;\n");
            }
            ctx.dedent();
        }
        ctx.dedent();
        ctx.append_tab();
        ctx.append("}\n");
        Ok(())
    }

    fn translate_variable_declaration(
        &self,
        ctx: &mut EmitContext,
        declared_type: &TypeDescriptor,
        name: &str,
        value: &Expression,
    ) -> GenResult<()> {
        let type_name = self.translate_type(declared_type)?;
        let value = self.translate_expression(ctx, value)?;
        ctx.append_tab();
        ctx.append(&type_name);
        ctx.append(" ");
        ctx.append(name);
        ctx.append(" = ");
        ctx.append_fragment(&value);
        ctx.append(";\n");
        Ok(())
    }

    fn translate_while(
        &self,
        ctx: &mut EmitContext,
        condition: &Expression,
        code: &[Statement],
    ) -> GenResult<()> {
        let condition = self.translate_expression(ctx, condition)?;
        ctx.append_tab();
        ctx.append("while (");
        ctx.append_fragment(&condition);
        ctx.append(")");
        self.write_block(ctx, code)?;
        ctx.append("}\n");
        Ok(())
    }

    fn translate_dictionary_try_get(
        &self,
        ctx: &mut EmitContext,
        target: &Expression,
        dictionary: &Expression,
        key: &Expression,
        fallback: &Expression,
    ) -> GenResult<()> {
        let target = self.translate_expression(ctx, target)?;
        let lookup = self.runtime_call(ctx, "DictionaryTryGet", &[dictionary, key, fallback])?;
        ctx.append_tab();
        ctx.append_fragment(&target);
        ctx.append(" = ");
        ctx.append_fragment(&lookup);
        ctx.append(";\n");
        Ok(())
    }

    fn generate_function(
        &self,
        ctx: &mut EmitContext,
        function: &FunctionDefinition,
    ) -> GenResult<()> {
        ctx.append_tab();
        ctx.append(&self.translate_type(&function.return_type)?);
        ctx.append(" ");
        ctx.append(function.name());
        ctx.append("(");
        for (i, (arg_type, arg_name)) in function
            .arg_types
            .iter()
            .zip(function.arg_names.iter())
            .enumerate()
        {
            if i > 0 {
                ctx.append(", ");
            }
            ctx.append(&self.translate_type(arg_type)?);
            ctx.append(" ");
            ctx.append(&arg_name.value);
        }
        ctx.append(")");
        self.write_block(ctx, &function.body)?;
        ctx.append("}\n");
        Ok(())
    }

    fn generate_struct(
        &self,
        ctx: &mut EmitContext,
        definition: &StructDefinition,
    ) -> GenResult<()> {
        let names = definition.flat_field_names.as_ref().ok_or_else(|| {
            GenError::internal(format!(
                "The struct '{}' was never flattened.",
                definition.name()
            ))
        })?;
        let types = definition.flat_field_types.as_ref().ok_or_else(|| {
            GenError::internal(format!(
                "The struct '{}' was never flattened.",
                definition.name()
            ))
        })?;
        ctx.append_tab();
        ctx.append("public sealed class ");
        ctx.append(definition.name());
        ctx.append(" {\n");
        ctx.indent();
        for (name, field_type) in names.iter().zip(types.iter()) {
            ctx.append_tab();
            ctx.append("public ");
            ctx.append(&self.translate_type(field_type)?);
            ctx.append(" ");
            ctx.append(&name.value);
            ctx.append(";\n");
        }
        ctx.append("\n");
        ctx.append_tab();
        ctx.append("public ");
        ctx.append(definition.name());
        ctx.append("(");
        for (i, (name, field_type)) in names.iter().zip(types.iter()).enumerate() {
            if i > 0 {
                ctx.append(", ");
            }
            ctx.append(&self.translate_type(field_type)?);
            ctx.append(" ");
            ctx.append(&name.value);
        }
        ctx.append(") {\n");
        ctx.indent();
        for name in names.iter() {
            ctx.append_tab();
            ctx.append("this.");
            ctx.append(&name.value);
            ctx.append(" = ");
            ctx.append(&name.value);
            ctx.append(";\n");
        }
        ctx.dedent();
        ctx.append_tab();
        ctx.append("}\n");
        ctx.dedent();
        ctx.append_tab();
        ctx.append("}\n");
        Ok(())
    }
}
