//! Signatures for the `Core.*` builtin operations.
//!
//! Each builtin carries a templated signature; invocation checking walks
//! the arguments through the template unifier and instantiates the return
//! type from the recorded bindings. `Core.StringConcatAll` repeats its
//! last parameter, and `Core.MathAbs` returns whichever numeric type it
//! was given.

use parser::ast::CoreFunction;
use parser::error::{ParseResult, PositionalError};
use parser::token::Token;
use parser::types::{TemplateMap, TypeDescriptor};
use parser::Expression;

/// A builtin's templated signature.
pub struct CoreSignature {
    pub arg_types: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
    /// When set, the final parameter may be supplied any number of times.
    pub last_arg_repeated: bool,
}

impl CoreSignature {
    fn new(arg_types: Vec<TypeDescriptor>, return_type: TypeDescriptor) -> Self {
        Self {
            arg_types,
            return_type,
            last_arg_repeated: false,
        }
    }

    fn repeated(arg_types: Vec<TypeDescriptor>, return_type: TypeDescriptor) -> Self {
        Self {
            arg_types,
            return_type,
            last_arg_repeated: true,
        }
    }
}

pub fn signature(function: CoreFunction) -> CoreSignature {
    use CoreFunction::*;
    let t = || TypeDescriptor::template('T');
    let k = || TypeDescriptor::template('K');
    let v = || TypeDescriptor::template('V');
    let int = TypeDescriptor::int;
    let double = TypeDescriptor::double;
    let boolean = TypeDescriptor::bool_type;
    let ch = TypeDescriptor::char_type;
    let string = TypeDescriptor::string;
    let void = TypeDescriptor::void;
    let object = TypeDescriptor::object;
    let number = TypeDescriptor::number;
    let builder = TypeDescriptor::string_builder;
    let list_t = || TypeDescriptor::list_of(t());
    let dict_kv = || TypeDescriptor::dictionary_of(k(), v());
    let sig = CoreSignature::new;

    match function {
        ArrayGet => sig(vec![TypeDescriptor::array_of(t()), int()], t()),
        ArrayJoin => sig(
            vec![TypeDescriptor::array_of(string()), string()],
            string(),
        ),
        ArrayLength => sig(vec![TypeDescriptor::array_of(t())], int()),
        ArrayNew => sig(vec![int()], TypeDescriptor::array_of(object())),
        ArraySet => sig(vec![TypeDescriptor::array_of(t()), int(), t()], void()),
        Base64ToBytes => sig(vec![string()], TypeDescriptor::array_of(int())),
        Base64ToString => sig(vec![string()], string()),
        BoolToString => sig(vec![boolean()], string()),
        BytesToBase64 => sig(vec![TypeDescriptor::array_of(int())], string()),
        CharToString => sig(vec![ch()], string()),
        Chr => sig(vec![int()], ch()),
        CurrentTimeSeconds => sig(vec![], double()),
        DictionaryContainsKey => sig(vec![dict_kv(), k()], boolean()),
        DictionaryGet => sig(vec![dict_kv(), k()], v()),
        DictionaryKeys => sig(vec![dict_kv()], TypeDescriptor::array_of(k())),
        DictionaryNew => sig(vec![], TypeDescriptor::dictionary_of(string(), object())),
        DictionaryRemove => sig(vec![dict_kv(), k()], void()),
        DictionarySet => sig(vec![dict_kv(), k(), v()], void()),
        DictionarySize => sig(vec![dict_kv()], int()),
        DictionaryTryGet => sig(vec![dict_kv(), k(), v()], v()),
        DictionaryValues => sig(vec![dict_kv()], TypeDescriptor::array_of(v())),
        EmitComment => sig(vec![string()], void()),
        FloatBuffer16 => sig(vec![], TypeDescriptor::array_of(double())),
        FloatToString => sig(vec![double()], string()),
        IntBuffer16 => sig(vec![], TypeDescriptor::array_of(int())),
        IntToString => sig(vec![int()], string()),
        IsValidInteger => sig(vec![string()], boolean()),
        ListAdd => sig(vec![list_t(), t()], void()),
        ListClear => sig(vec![list_t()], void()),
        ListConcat => sig(vec![list_t(), list_t()], list_t()),
        ListGet => sig(vec![list_t(), int()], t()),
        ListInsert => sig(vec![list_t(), int(), t()], void()),
        ListJoinChars => sig(vec![TypeDescriptor::list_of(ch())], string()),
        ListJoinStrings => sig(
            vec![TypeDescriptor::list_of(string()), string()],
            string(),
        ),
        ListNew => sig(vec![], TypeDescriptor::list_of(object())),
        ListPop => sig(vec![list_t()], t()),
        ListRemoveAt => sig(vec![list_t(), int()], void()),
        ListReverse => sig(vec![list_t()], void()),
        ListSet => sig(vec![list_t(), int(), t()], void()),
        ListShuffle => sig(vec![list_t()], void()),
        ListSize => sig(vec![list_t()], int()),
        ListToArray => sig(vec![list_t()], TypeDescriptor::array_of(t())),
        MathAbs => sig(vec![number()], number()),
        MathArcCos | MathArcSin | MathCos | MathSin | MathTan | MathLog => {
            sig(vec![double()], double())
        }
        MathArcTan => sig(vec![double(), double()], double()),
        MathCeil | MathFloor => sig(vec![double()], int()),
        MathPow => sig(vec![double(), double()], double()),
        MultiplyList => sig(vec![list_t(), int()], list_t()),
        Ord => sig(vec![ch()], int()),
        ParseFloatUnsafe => sig(vec![string()], double()),
        ParseInt => sig(vec![string()], int()),
        PrintStdErr | PrintStdOut => sig(vec![string()], void()),
        RandomFloat => sig(vec![], double()),
        SortedCopyOfIntArray => sig(
            vec![TypeDescriptor::array_of(int())],
            TypeDescriptor::array_of(int()),
        ),
        SortedCopyOfStringArray => sig(
            vec![TypeDescriptor::array_of(string())],
            TypeDescriptor::array_of(string()),
        ),
        StringAppend => sig(vec![string(), string()], string()),
        StringBuffer16 => sig(vec![], TypeDescriptor::array_of(string())),
        StringBuilderAdd => sig(vec![builder(), object()], void()),
        StringBuilderClear => sig(vec![builder()], void()),
        StringBuilderNew => sig(vec![], builder()),
        StringBuilderToString => sig(vec![builder()], string()),
        StringCharAt => sig(vec![string(), int()], ch()),
        StringCharCodeAt => sig(vec![string(), int()], int()),
        StringCompareIsReverse => sig(vec![string(), string()], boolean()),
        StringConcatAll => CoreSignature::repeated(vec![string()], string()),
        StringContains | StringEndsWith | StringEquals | StringStartsWith => {
            sig(vec![string(), string()], boolean())
        }
        StringFromCharCode => sig(vec![int()], string()),
        StringIndexOf | StringLastIndexOf => sig(vec![string(), string()], int()),
        StringIndexOfWithStart => sig(vec![string(), string(), int()], int()),
        StringLength => sig(vec![string()], int()),
        StringReplace => sig(vec![string(), string(), string()], string()),
        StringReverse => sig(vec![string()], string()),
        StringSplit => sig(vec![string(), string()], TypeDescriptor::array_of(string())),
        StringSubstring => sig(vec![string(), int(), int()], string()),
        StringSubstringIsEqualTo => sig(vec![string(), int(), string()], boolean()),
        StringToLower | StringToUpper | StringTrim | StringTrimEnd | StringTrimStart => {
            sig(vec![string()], string())
        }
        StringToUtf8Bytes => sig(vec![string()], TypeDescriptor::array_of(int())),
        StrongReferenceEquality => sig(vec![object(), object()], boolean()),
        ToCodeString => sig(vec![string()], string()),
        TryParseFloat => sig(
            vec![string(), TypeDescriptor::array_of(double())],
            void(),
        ),
        Utf8BytesToString => sig(vec![TypeDescriptor::array_of(int())], string()),
    }
}

/// Check an invocation's arguments against the builtin's signature and
/// produce the instantiated return type. Arguments must already carry
/// resolved types.
pub fn resolve_invocation(
    open_paren: &Token,
    function: CoreFunction,
    args: &[Expression],
) -> ParseResult<TypeDescriptor> {
    let signature = signature(function);
    let expected = signature.arg_types.len();
    let arity_ok = if signature.last_arg_repeated {
        args.len() >= expected
    } else {
        args.len() == expected
    };
    if !arity_ok {
        let quantifier = if signature.last_arg_repeated { "at least " } else { "" };
        return Err(PositionalError::type_error(
            open_paren,
            format!(
                "Core.{} expects {}{} argument(s) but found {}.",
                function.name(),
                quantifier,
                expected,
                args.len()
            ),
        ));
    }

    let mut templates = TemplateMap::new();
    for (i, arg) in args.iter().enumerate() {
        let slot = i.min(expected.saturating_sub(1));
        let declared = &signature.arg_types[slot];
        let actual = arg.require_type()?;
        if !TypeDescriptor::unify_with_output(declared, actual, &mut templates) {
            return Err(PositionalError::type_error(
                &arg.first_token,
                format!(
                    "Incorrect argument type for Core.{}. Expected '{}' but found '{}'.",
                    function.name(),
                    declared.resolve_templates(&templates),
                    actual
                ),
            ));
        }
    }

    if function == CoreFunction::MathAbs {
        // Abs preserves the numeric type it is given.
        let actual = args[0].require_type()?;
        return Ok(actual.clone());
    }
    Ok(signature.return_type.resolve_templates(&templates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::ExpressionKind;

    fn typed(value_type: TypeDescriptor) -> Expression {
        Expression::with_type(
            Token::synthetic("arg"),
            ExpressionKind::NullConstant,
            value_type,
        )
    }

    #[test]
    fn list_get_instantiates_the_item_type() {
        let list = typed(TypeDescriptor::list_of(TypeDescriptor::string()));
        let index = typed(TypeDescriptor::int());
        let result = resolve_invocation(
            &Token::synthetic("("),
            CoreFunction::ListGet,
            &[list, index],
        )
        .unwrap();
        assert!(result.is_identical(&TypeDescriptor::string()));
    }

    #[test]
    fn template_bindings_must_be_consistent() {
        let list = typed(TypeDescriptor::list_of(TypeDescriptor::int()));
        let value = typed(TypeDescriptor::string());
        let err = resolve_invocation(
            &Token::synthetic("("),
            CoreFunction::ListAdd,
            &[list, value],
        )
        .unwrap_err();
        assert!(err.message.contains("Expected 'int'"));
    }

    #[test]
    fn concat_all_accepts_any_number_of_strings() {
        let args: Vec<Expression> = (0..4).map(|_| typed(TypeDescriptor::string())).collect();
        let result = resolve_invocation(
            &Token::synthetic("("),
            CoreFunction::StringConcatAll,
            &args,
        )
        .unwrap();
        assert!(result.is_identical(&TypeDescriptor::string()));

        let empty_err =
            resolve_invocation(&Token::synthetic("("), CoreFunction::StringConcatAll, &[])
                .unwrap_err();
        assert!(empty_err.message.contains("at least 1"));
    }

    #[test]
    fn abs_preserves_the_numeric_type() {
        let result = resolve_invocation(
            &Token::synthetic("("),
            CoreFunction::MathAbs,
            &[typed(TypeDescriptor::double())],
        )
        .unwrap();
        assert!(result.is_identical(&TypeDescriptor::double()));

        let int_result = resolve_invocation(
            &Token::synthetic("("),
            CoreFunction::MathAbs,
            &[typed(TypeDescriptor::int())],
        )
        .unwrap();
        assert!(int_result.is_identical(&TypeDescriptor::int()));
    }

    #[test]
    fn dictionary_try_get_returns_the_value_type() {
        let dict = typed(TypeDescriptor::dictionary_of(
            TypeDescriptor::string(),
            TypeDescriptor::int(),
        ));
        let key = typed(TypeDescriptor::string());
        let fallback = typed(TypeDescriptor::int());
        let result = resolve_invocation(
            &Token::synthetic("("),
            CoreFunction::DictionaryTryGet,
            &[dict, key, fallback],
        )
        .unwrap();
        assert!(result.is_identical(&TypeDescriptor::int()));
    }

    #[test]
    fn arity_mismatch_is_reported_with_counts() {
        let err = resolve_invocation(
            &Token::synthetic("("),
            CoreFunction::Ord,
            &[typed(TypeDescriptor::char_type()), typed(TypeDescriptor::int())],
        )
        .unwrap_err();
        assert!(err.message.contains("expects 1 argument(s) but found 2"));
    }
}
