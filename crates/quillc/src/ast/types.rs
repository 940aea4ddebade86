//! The closed static type system and resolved binding records

use std::fmt;

/// Static types of the language.
///
/// `Any` and `Comparable` are structural supertypes that only ever appear
/// on the target side of an assignability check; no value carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Any,
    Nil,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
    Comparable,
}

impl Type {
    /// Resolve a declared type name from the source text
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "Any" => Some(Type::Any),
            "Nil" => Some(Type::Nil),
            "Boolean" => Some(Type::Boolean),
            "Integer" => Some(Type::Integer),
            "Decimal" => Some(Type::Decimal),
            "Character" => Some(Type::Character),
            "String" => Some(Type::String),
            "Comparable" => Some(Type::Comparable),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Any => "Any",
            Type::Nil => "Nil",
            Type::Boolean => "Boolean",
            Type::Integer => "Integer",
            Type::Decimal => "Decimal",
            Type::Character => "Character",
            Type::String => "String",
            Type::Comparable => "Comparable",
        }
    }

    /// Host representation name used by the code generator
    pub fn jvm_name(self) -> &'static str {
        match self {
            Type::Any => "Object",
            Type::Nil => "Void",
            Type::Boolean => "boolean",
            Type::Integer => "int",
            Type::Decimal => "double",
            Type::Character => "char",
            Type::String => "String",
            Type::Comparable => "Comparable",
        }
    }

    /// The assignability preorder: `Any` accepts anything, `Comparable`
    /// accepts the four ordered value types, everything else only itself.
    pub fn is_assignable_from(self, source: Type) -> bool {
        match self {
            Type::Any => true,
            Type::Comparable => matches!(
                source,
                Type::Integer | Type::Decimal | Type::Character | Type::String
            ),
            target => target == source,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved static binding of a variable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type, mutable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            mutable,
        }
    }
}

/// Resolved static binding of a function; identity is (name, arity)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub name: String,
    /// Name the code generator renders calls with; differs from `name`
    /// only for builtins (`print` becomes `System.out.println`)
    pub display_name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

impl FunctionSig {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        parameter_types: Vec<Type>,
        return_type: Type,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            parameter_types,
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}
