//! The language-neutral builtin operation set.
//!
//! Source code reaches these through the `Core` namespace
//! (`Core.ListAdd(items, x)`); each variant corresponds to one translation
//! operation on the backend contract. Signatures live in the compiler
//! crate, next to the type checker that consumes them.

macro_rules! core_functions {
    ($($variant:ident),+ $(,)?) => {
        /// One builtin operation per backend translation method.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum CoreFunction {
            $($variant),+
        }

        impl CoreFunction {
            /// The name used in source code after the `Core.` prefix.
            pub fn name(self) -> &'static str {
                match self {
                    $(CoreFunction::$variant => stringify!($variant)),+
                }
            }

            pub fn from_name(name: &str) -> Option<CoreFunction> {
                match name {
                    $(stringify!($variant) => Some(CoreFunction::$variant)),+,
                    _ => None,
                }
            }
        }
    };
}

core_functions! {
    ArrayGet,
    ArrayJoin,
    ArrayLength,
    ArrayNew,
    ArraySet,
    Base64ToBytes,
    Base64ToString,
    BoolToString,
    BytesToBase64,
    CharToString,
    Chr,
    CurrentTimeSeconds,
    DictionaryContainsKey,
    DictionaryGet,
    DictionaryKeys,
    DictionaryNew,
    DictionaryRemove,
    DictionarySet,
    DictionarySize,
    DictionaryTryGet,
    DictionaryValues,
    EmitComment,
    FloatBuffer16,
    FloatToString,
    IntBuffer16,
    IntToString,
    IsValidInteger,
    ListAdd,
    ListClear,
    ListConcat,
    ListGet,
    ListInsert,
    ListJoinChars,
    ListJoinStrings,
    ListNew,
    ListPop,
    ListRemoveAt,
    ListReverse,
    ListSet,
    ListShuffle,
    ListSize,
    ListToArray,
    MathAbs,
    MathArcCos,
    MathArcSin,
    MathArcTan,
    MathCeil,
    MathCos,
    MathFloor,
    MathLog,
    MathPow,
    MathSin,
    MathTan,
    MultiplyList,
    Ord,
    ParseFloatUnsafe,
    ParseInt,
    PrintStdErr,
    PrintStdOut,
    RandomFloat,
    SortedCopyOfIntArray,
    SortedCopyOfStringArray,
    StringAppend,
    StringBuffer16,
    StringBuilderAdd,
    StringBuilderClear,
    StringBuilderNew,
    StringBuilderToString,
    StringCharAt,
    StringCharCodeAt,
    StringCompareIsReverse,
    StringConcatAll,
    StringContains,
    StringEndsWith,
    StringEquals,
    StringFromCharCode,
    StringIndexOf,
    StringIndexOfWithStart,
    StringLastIndexOf,
    StringLength,
    StringReplace,
    StringReverse,
    StringSplit,
    StringStartsWith,
    StringSubstring,
    StringSubstringIsEqualTo,
    StringToLower,
    StringToUpper,
    StringToUtf8Bytes,
    StringTrim,
    StringTrimEnd,
    StringTrimStart,
    StrongReferenceEquality,
    ToCodeString,
    TryParseFloat,
    Utf8BytesToString,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        assert_eq!(CoreFunction::ListAdd.name(), "ListAdd");
        assert_eq!(CoreFunction::from_name("ListAdd"), Some(CoreFunction::ListAdd));
        assert_eq!(CoreFunction::from_name("NotAThing"), None);
    }
}
