//! Type descriptor model: the immutable value a synthesized type expression
//! parses into, plus its single-line declarator rendering.

use std::fmt;

use smallvec::SmallVec;

/// One wrapper in a modifier chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier
{
    Pointer,
    Reference,
    Const,
    Restrict,
}

impl Modifier
{
    fn symbol(self) -> &'static str
    {
        match self {
            Modifier::Pointer => "*",
            Modifier::Reference => "&",
            Modifier::Const => "const",
            Modifier::Restrict => "restrict",
        }
    }
}

/// What the underlying type turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass
{
    Void,
    Base,
    Enum,
    Aggregate,
    Typedef,
    Function,
    PtrToMember,
    Array,
}

/// A parsed type expression.
///
/// `modifiers` is ordered innermost-first: each wrapper peeled while walking
/// from the declaration towards the underlying type is pushed at the front,
/// so index 0 sits next to the base type and the last element is the
/// outermost wrapper. Rendering rules below depend on that order.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDesc
{
    /// Name of the underlying type, or the rendered expression for function
    /// types and array element types.
    pub base_name: String,
    /// C tag keyword (`struct` / `union` / `enum`) when the name needs one.
    pub keyword: Option<&'static str>,
    pub modifiers: SmallVec<[Modifier; 4]>,
    /// Enclosing aggregate/namespace names, outermost first.
    pub scopes: Vec<String>,
    /// Array dimensions; `None` is an unknown bound and renders as `[]`.
    pub dims: Vec<Option<u64>>,
    pub class: TypeClass,
}

impl TypeDesc
{
    /// The expression for an entry with no type reference.
    pub fn void() -> Self
    {
        TypeDesc {
            base_name: "void".into(),
            keyword: None,
            modifiers: SmallVec::new(),
            scopes: Vec::new(),
            dims: Vec::new(),
            class: TypeClass::Void,
        }
    }

    pub fn named(base_name: impl Into<String>, keyword: Option<&'static str>, class: TypeClass) -> Self
    {
        TypeDesc {
            base_name: base_name.into(),
            keyword,
            modifiers: SmallVec::new(),
            scopes: Vec::new(),
            dims: Vec::new(),
            class,
        }
    }

    /// True when the outermost modifier is a pointer.
    pub fn is_pointer(&self) -> bool
    {
        self.modifiers.last() == Some(&Modifier::Pointer)
    }

    /// The scope-qualified type name, keyword included: `struct Outer::Foo`.
    pub fn qualified_name(&self) -> String
    {
        let mut out = String::new();
        if let Some(keyword) = self.keyword {
            out.push_str(keyword);
            out.push(' ');
        }
        for scope in &self.scopes {
            out.push_str(scope);
            out.push_str("::");
        }
        out.push_str(&self.base_name);
        out
    }

    /// The type by itself, with no declared name: `const char *`.
    pub fn type_text(&self) -> String
    {
        self.declare("")
    }

    /// Render the single-line declarator for `name`.
    ///
    /// Precedence rules: the dimension suffix binds tighter than a pointer
    /// prefix, so a pointer wrapped around a dimensioned type parenthesizes
    /// the pointer-and-name core (`int (*name)[10]`). A const adjacent to
    /// the base type migrates to a leading `const`, as does a const wrapped
    /// around a reference (which binds at the reference's own position).
    pub fn declare(&self, name: &str) -> String
    {
        let mut mods = self.modifiers.clone();
        let mut lead_const = false;
        if mods.first() == Some(&Modifier::Const) {
            lead_const = true;
            mods.remove(0);
        }
        let n = mods.len();
        if n >= 2 && mods[n - 1] == Modifier::Const && mods[n - 2] == Modifier::Reference {
            lead_const = true;
            mods.pop();
        }

        let mut out = String::new();
        if lead_const {
            out.push_str("const ");
        }
        out.push_str(&self.qualified_name());

        let mut core = String::new();
        for modifier in &mods {
            let symbol = modifier.symbol();
            if symbol.starts_with(char::is_alphabetic) && ends_alphanumeric(&core) {
                core.push(' ');
            }
            core.push_str(symbol);
        }
        if !name.is_empty() {
            if ends_alphanumeric(&core) {
                core.push(' ');
            }
            core.push_str(name);
        }

        let indirect = mods
            .iter()
            .any(|m| matches!(m, Modifier::Pointer | Modifier::Reference));
        if indirect && !self.dims.is_empty() {
            core = format!("({core})");
        }
        for dim in &self.dims {
            match dim {
                Some(bound) => {
                    core.push('[');
                    core.push_str(&bound.to_string());
                    core.push(']');
                }
                None => core.push_str("[]"),
            }
        }

        if !core.is_empty() {
            if !out.ends_with('*') && !out.ends_with('&') {
                out.push(' ');
            }
            out.push_str(&core);
        }
        out
    }
}

fn ends_alphanumeric(s: &str) -> bool
{
    s.chars().next_back().is_some_and(char::is_alphanumeric)
}

impl fmt::Display for TypeDesc
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.type_text())
    }
}
