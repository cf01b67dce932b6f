use indexmap::IndexMap;
use std::fmt;

/// Represents a symbolic term
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Term {
    /// A variable placeholder that can be bound during unification (e.g., `?x`)
    Variable(String),
    /// A concrete symbol/constant (e.g., `"alice"`, `"bob"`)
    Symbol(String),
    /// A nested compound statement used as an argument
    Compound(Statement),
}

impl Term {
    /// Create a variable term
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// Create a symbol term
    #[must_use]
    pub fn sym(name: impl Into<String>) -> Self {
        Term::Symbol(name.into())
    }

    /// Returns true if the term is a variable
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }
}

/// A statement: a predicate symbol applied to ordered argument terms
/// (e.g., `(parent john mary)`). A statement with no arguments is a bare
/// proposition.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statement {
    /// The name of the predicate (e.g., `"parent"`, `"grandparent"`)
    pub predicate: String,
    /// The arguments of the predicate; may contain variables and nested compounds
    pub args: Vec<Term>,
}

impl Statement {
    /// Create a statement from a predicate name and argument terms
    #[must_use]
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    /// Returns true if no argument contains a variable
    #[must_use]
    pub fn is_ground(&self) -> bool {
        fn ground(term: &Term) -> bool {
            match term {
                Term::Variable(_) => false,
                Term::Symbol(_) => true,
                Term::Compound(statement) => statement.args.iter().all(ground),
            }
        }
        self.args.iter().all(ground)
    }
}

/// A consistent variable-to-term substitution produced by unification.
///
/// A variable bound twice must bind to structurally equal terms; binding
/// order is preserved for iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    map: IndexMap<String, Term>,
}

impl Binding {
    /// Create an empty binding
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the term bound to a variable name
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.map.get(variable)
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no variable is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over bound variables in binding order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.map.iter().map(|(name, term)| (name.as_str(), term))
    }

    /// Bind `variable` to `term`, or check consistency if already bound.
    /// Returns false on a conflicting rebinding.
    pub(crate) fn bind(&mut self, variable: &str, term: &Term) -> bool {
        match self.map.get(variable) {
            Some(existing) => existing == term,
            None => {
                self.map.insert(variable.to_string(), term.clone());
                true
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "?{name}"),
            Term::Symbol(name) => write!(f, "{name}"),
            Term::Compound(statement) => write!(f, "{statement}"),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, term)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "?{name}: {term}")?;
        }
        write!(f, "}}")
    }
}
