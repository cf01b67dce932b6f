//! Structural unification and instantiation over the term model.
//!
//! Matching is one-directional and deterministic: variables in the pattern
//! side bind to whatever term sits in the same position on the ground side,
//! while variables on the ground side are treated as inert terms. There is
//! no enumeration of alternative unifiers.

use crate::term::{Binding, Statement, Term};

/// Unify a pattern statement against a ground statement.
///
/// Fails on predicate or arity mismatch, and on a variable that would need
/// two structurally different bindings. Failure is a normal outcome, not an
/// error.
#[must_use]
pub fn unify(pattern: &Statement, ground: &Statement) -> Option<Binding> {
    let mut binding = Binding::new();
    if unify_statement(pattern, ground, &mut binding) {
        Some(binding)
    } else {
        None
    }
}

fn unify_statement(pattern: &Statement, ground: &Statement, binding: &mut Binding) -> bool {
    if pattern.predicate != ground.predicate || pattern.args.len() != ground.args.len() {
        return false;
    }
    pattern
        .args
        .iter()
        .zip(&ground.args)
        .all(|(p, g)| unify_term(p, g, binding))
}

fn unify_term(pattern: &Term, ground: &Term, binding: &mut Binding) -> bool {
    match (pattern, ground) {
        (Term::Variable(name), g) => binding.bind(name, g),
        (Term::Symbol(a), Term::Symbol(b)) => a == b,
        (Term::Compound(p), Term::Compound(g)) => unify_statement(p, g, binding),
        _ => false,
    }
}

/// Substitute every variable present in `binding`; variables absent from the
/// binding are left as placeholders.
#[must_use]
pub fn instantiate(term: &Term, binding: &Binding) -> Term {
    match term {
        Term::Variable(name) => binding.get(name).cloned().unwrap_or_else(|| term.clone()),
        Term::Symbol(_) => term.clone(),
        Term::Compound(statement) => Term::Compound(instantiate_statement(statement, binding)),
    }
}

/// Instantiate every argument of a statement under `binding`.
#[must_use]
pub fn instantiate_statement(statement: &Statement, binding: &Binding) -> Statement {
    Statement {
        predicate: statement.predicate.clone(),
        args: statement
            .args
            .iter()
            .map(|arg| instantiate(arg, binding))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(predicate: &str, args: Vec<Term>) -> Statement {
        Statement::new(predicate, args)
    }

    #[test]
    fn test_unify_binds_variables_to_symbols() {
        let pattern = stmt("parent", vec![Term::var("x"), Term::sym("mary")]);
        let ground = stmt("parent", vec![Term::sym("john"), Term::sym("mary")]);

        let binding = unify(&pattern, &ground).expect("should unify");
        assert_eq!(binding.get("x"), Some(&Term::sym("john")));
        assert_eq!(binding.len(), 1);
    }

    #[test]
    fn test_unify_fails_on_predicate_mismatch() {
        let pattern = stmt("parent", vec![Term::var("x")]);
        let ground = stmt("sibling", vec![Term::sym("john")]);
        assert!(unify(&pattern, &ground).is_none());
    }

    #[test]
    fn test_unify_fails_on_arity_mismatch() {
        let pattern = stmt("parent", vec![Term::var("x")]);
        let ground = stmt("parent", vec![Term::sym("john"), Term::sym("mary")]);
        assert!(unify(&pattern, &ground).is_none());
    }

    #[test]
    fn test_unify_rejects_conflicting_rebinding() {
        // (same ?x ?x) cannot match (same a b)
        let pattern = stmt("same", vec![Term::var("x"), Term::var("x")]);
        let conflicting = stmt("same", vec![Term::sym("a"), Term::sym("b")]);
        let consistent = stmt("same", vec![Term::sym("c"), Term::sym("c")]);

        assert!(unify(&pattern, &conflicting).is_none());
        assert!(unify(&pattern, &consistent).is_some());
    }

    #[test]
    fn test_unify_recurses_into_nested_compounds() {
        let pattern = stmt(
            "owns",
            vec![
                Term::var("who"),
                Term::Compound(stmt("book", vec![Term::var("title")])),
            ],
        );
        let ground = stmt(
            "owns",
            vec![
                Term::sym("john"),
                Term::Compound(stmt("book", vec![Term::sym("hamlet")])),
            ],
        );

        let binding = unify(&pattern, &ground).expect("should unify");
        assert_eq!(binding.get("who"), Some(&Term::sym("john")));
        assert_eq!(binding.get("title"), Some(&Term::sym("hamlet")));
    }

    #[test]
    fn test_unify_ground_side_variable_is_inert() {
        // A variable on the ground side only matches a pattern variable,
        // which then binds to it.
        let pattern = stmt("p", vec![Term::var("x")]);
        let ground = stmt("p", vec![Term::var("y")]);

        let binding = unify(&pattern, &ground).expect("should unify");
        assert_eq!(binding.get("x"), Some(&Term::var("y")));

        let symbol_pattern = stmt("p", vec![Term::sym("a")]);
        assert!(unify(&symbol_pattern, &ground).is_none());
    }

    #[test]
    fn test_instantiate_leaves_unbound_variables() {
        let pattern = stmt("parent", vec![Term::var("x"), Term::var("y")]);
        let ground = stmt("parent", vec![Term::sym("john"), Term::sym("mary")]);
        let binding = unify(&pattern, &ground).expect("should unify");

        let template = stmt(
            "family",
            vec![Term::var("x"), Term::var("y"), Term::var("unbound")],
        );
        let instantiated = instantiate_statement(&template, &binding);
        assert_eq!(
            instantiated,
            stmt(
                "family",
                vec![Term::sym("john"), Term::sym("mary"), Term::var("unbound")]
            )
        );
    }

    #[test]
    fn test_instantiate_substitutes_inside_compounds() {
        let mut binding = Binding::new();
        assert!(binding.bind("x", &Term::sym("hamlet")));

        let template = Term::Compound(stmt("book", vec![Term::var("x")]));
        assert_eq!(
            instantiate(&template, &binding),
            Term::Compound(stmt("book", vec![Term::sym("hamlet")]))
        );
    }
}
