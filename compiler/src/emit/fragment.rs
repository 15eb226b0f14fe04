//! Precedence-ranked output fragments.
//!
//! Backends build expression text as a rope of [`Fragment`]s, each tagged
//! with how tightly its outermost operator binds. Parentheses are never
//! emitted by default; a parent asks its children to guarantee a minimum
//! tightness and a child wraps itself only when it cannot. An explicit
//! `ForcedParenthesis` in the source survives as an `Atomic` wrap.

use std::fmt;

/// How tightly a rendered expression binds, from loosest to tightest.
/// The order of the variants is the total order used for comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tightness {
    Unknown,
    Ternary,
    BooleanLogic,
    Bitwise,
    Equality,
    Inequality,
    Bitshift,
    Addition,
    Multiplication,
    UnaryPrefix,
    UnarySuffix,
    SuffixSequence,
    Atomic,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(String),
    Join(Box<Node>, Box<Node>),
}

/// A rope of output text with a tightness rank.
#[derive(Debug, Clone)]
pub struct Fragment {
    tightness: Tightness,
    node: Node,
}

impl Fragment {
    /// A plain text fragment with no known binding strength.
    pub fn of(text: impl Into<String>) -> Fragment {
        Fragment {
            tightness: Tightness::Unknown,
            node: Node::Leaf(text.into()),
        }
    }

    /// A fragment that can never need parentheses: literals, identifiers.
    pub fn atom(text: impl Into<String>) -> Fragment {
        Fragment::of(text).with_tightness(Tightness::Atomic)
    }

    pub fn tightness(&self) -> Tightness {
        self.tightness
    }

    pub fn with_tightness(mut self, tightness: Tightness) -> Fragment {
        self.tightness = tightness;
        self
    }

    /// Concatenate; the result's tightness is unknown until set.
    pub fn push(self, other: impl Into<Fragment>) -> Fragment {
        Fragment {
            tightness: Tightness::Unknown,
            node: Node::Join(Box::new(self.node), Box::new(other.into().node)),
        }
    }

    pub fn prepend(self, other: impl Into<Fragment>) -> Fragment {
        Fragment {
            tightness: Tightness::Unknown,
            node: Node::Join(Box::new(other.into().node), Box::new(self.node)),
        }
    }

    /// Guarantee at least `minimum` tightness; a tie is acceptable.
    /// Used for the side of an operator where associativity permits an
    /// equal-precedence child to stay bare.
    pub fn ensure_tightness(self, minimum: Tightness) -> Fragment {
        if self.tightness >= minimum {
            self
        } else {
            self.parenthesize()
        }
    }

    /// Guarantee strictly greater tightness; a tie wraps. Used for the
    /// side where a bare equal-precedence child would reassociate.
    pub fn ensure_greater_tightness(self, threshold: Tightness) -> Fragment {
        if self.tightness > threshold {
            self
        } else {
            self.parenthesize()
        }
    }

    pub fn parenthesize(self) -> Fragment {
        Fragment::of("(")
            .push(self)
            .push(")")
            .with_tightness(Tightness::Atomic)
    }

    /// Render the rope. Iterative so deep expression trees cannot blow
    /// the stack.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![&self.node];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf(text) => out.push_str(text),
                Node::Join(left, right) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Fragment {
        Fragment::of(text)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Fragment {
        Fragment::of(text)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_stay_bare_with_ensure_tightness() {
        let child = Fragment::of("a + b").with_tightness(Tightness::Addition);
        let kept = child.ensure_tightness(Tightness::Addition);
        assert_eq!(kept.flatten(), "a + b");
    }

    #[test]
    fn ties_wrap_with_ensure_greater_tightness() {
        let child = Fragment::of("a - b").with_tightness(Tightness::Addition);
        let wrapped = child.ensure_greater_tightness(Tightness::Addition);
        assert_eq!(wrapped.flatten(), "(a - b)");
        assert_eq!(wrapped.tightness(), Tightness::Atomic);
    }

    #[test]
    fn looser_children_wrap() {
        let child = Fragment::of("a + b").with_tightness(Tightness::Addition);
        let wrapped = child.ensure_tightness(Tightness::Multiplication);
        assert_eq!(wrapped.flatten(), "(a + b)");
    }

    #[test]
    fn atoms_never_wrap() {
        let atom = Fragment::atom("x");
        assert_eq!(
            atom.ensure_greater_tightness(Tightness::SuffixSequence).flatten(),
            "x"
        );
    }

    #[test]
    fn ropes_flatten_in_order() {
        let frag = Fragment::of("a")
            .push(" + ")
            .push(Fragment::of("b").push(" * ").push("c"));
        assert_eq!(frag.flatten(), "a + b * c");
        assert_eq!(frag.prepend("x = ").flatten(), "x = a + b * c");
    }

    #[test]
    fn tightness_order_matches_grammar_strength() {
        assert!(Tightness::Atomic > Tightness::SuffixSequence);
        assert!(Tightness::Multiplication > Tightness::Addition);
        assert!(Tightness::Addition > Tightness::Equality);
        assert!(Tightness::Equality > Tightness::BooleanLogic);
        assert!(Tightness::BooleanLogic > Tightness::Unknown);
    }
}
