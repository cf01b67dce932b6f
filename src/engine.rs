use crate::term::{Binding, Statement};
use crate::unify::{instantiate_statement, unify};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use smallvec::SmallVec;
use std::fmt;

/// Stable identifier of a fact stored in a [`KnowledgeBase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactId(u64);

/// Stable identifier of a rule stored in a [`KnowledgeBase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u64);

/// One derivation record: the fact/rule pair that justifies a derived entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Support {
    /// The fact half of the derivation
    pub fact: FactId,
    /// The rule half of the derivation
    pub rule: RuleId,
}

/// A statement held true, either by direct assertion or by derivation
#[derive(Debug, Clone)]
pub struct Fact {
    /// The statement this fact wraps
    pub statement: Statement,
    /// True iff a caller directly asserted this fact
    pub asserted: bool,
    /// Derivations justifying this fact; empty iff it has none
    pub supported_by: SmallVec<[Support; 2]>,
    /// Facts this fact helped derive, one occurrence per support pair
    pub supports_facts: SmallVec<[FactId; 2]>,
    /// Rules this fact helped derive, one occurrence per support pair
    pub supports_rules: SmallVec<[RuleId; 2]>,
}

/// An implication from conjunctive condition statements to one consequent
#[derive(Debug, Clone)]
pub struct Rule {
    /// Condition statements, all of which must hold
    pub lhs: Vec<Statement>,
    /// The consequent statement
    pub rhs: Statement,
    /// True iff a caller directly asserted this rule
    pub asserted: bool,
    /// Derivations justifying this rule; empty iff it has none
    pub supported_by: SmallVec<[Support; 2]>,
    /// Facts this rule helped derive, one occurrence per support pair
    pub supports_facts: SmallVec<[FactId; 2]>,
    /// Rules this rule helped derive, one occurrence per support pair
    pub supports_rules: SmallVec<[RuleId; 2]>,
}

/// One query answer: a binding and the fact(s) it was matched against
#[derive(Debug, Clone)]
pub struct Answer {
    /// Variable bindings that satisfy the query
    pub binding: Binding,
    /// The supporting fact(s) behind this answer
    pub support: Vec<FactId>,
}

/// Entity scheduled for cascade removal
#[derive(Debug, Clone, Copy)]
enum Removal {
    Fact(FactId),
    Rule(RuleId),
}

/// The knowledge base: owns all facts and rules, triggers forward chaining
/// on insertion, answers queries, and keeps the support graph consistent
/// under retraction.
///
/// Facts and rules are deduplicated structurally; insertion order is
/// preserved for iteration. Every derivation is recorded as a [`Support`]
/// pair on the derived entity and mirrored on both entities it was derived
/// from, so that retraction can remove exactly the knowledge left without
/// justification.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    facts: IndexMap<FactId, Fact>,
    rules: IndexMap<RuleId, Rule>,
    /// Fact ids grouped by predicate name for candidate lookup
    facts_by_pred: IndexMap<String, IndexSet<FactId>>,
    next_fact: u64,
    next_rule: u64,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of facts currently held
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Number of rules currently held
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Look up a fact by id
    #[must_use]
    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(&id)
    }

    /// Look up a rule by id
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Find the fact whose statement structurally equals `statement`
    #[must_use]
    pub fn find_fact(&self, statement: &Statement) -> Option<FactId> {
        self.facts_by_pred
            .get(&statement.predicate)?
            .iter()
            .find(|id| {
                self.facts
                    .get(*id)
                    .is_some_and(|fact| fact.statement == *statement)
            })
            .copied()
    }

    /// Find the rule whose conditions and consequent structurally equal
    /// `lhs` and `rhs`
    #[must_use]
    pub fn find_rule(&self, lhs: &[Statement], rhs: &Statement) -> Option<RuleId> {
        self.rules
            .iter()
            .find(|(_, rule)| rule.lhs.as_slice() == lhs && rule.rhs == *rhs)
            .map(|(id, _)| *id)
    }

    /// Iterate over all facts in insertion order
    pub fn facts(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.facts.iter().map(|(id, fact)| (*id, fact))
    }

    /// Iterate over all rules in insertion order
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().map(|(id, rule)| (*id, rule))
    }

    /// Assert a fact: the statement is held true independent of any
    /// derivation. Triggers forward chaining against every rule currently
    /// in the knowledge base; derived knowledge is inserted recursively
    /// until no new derivation is produced.
    ///
    /// Asserting an already-known fact is idempotent and triggers no
    /// chaining.
    pub fn assert_fact(&mut self, statement: Statement) -> FactId {
        debug!("asserting fact {statement}");
        self.add_fact(statement, None)
    }

    /// Assert a rule. Triggers forward chaining against every fact
    /// currently in the knowledge base, like [`assert_fact`].
    ///
    /// A rule with no conditions never fires.
    ///
    /// [`assert_fact`]: KnowledgeBase::assert_fact
    pub fn assert_rule(&mut self, lhs: Vec<Statement>, rhs: Statement) -> RuleId {
        debug!("asserting rule {}", DisplayRule(&lhs, &rhs));
        self.add_rule(lhs, rhs, None)
    }

    /// Return every binding under which `query` unifies with a stored
    /// fact, each paired with the fact it matched. Does not mutate the
    /// knowledge base.
    #[must_use]
    pub fn ask(&self, query: &Statement) -> Vec<Answer> {
        debug!("asking {query}");
        let Some(candidates) = self.facts_by_pred.get(&query.predicate) else {
            return Vec::new();
        };
        candidates
            .iter()
            .filter_map(|id| {
                let fact = self.facts.get(id)?;
                unify(query, &fact.statement).map(|binding| Answer {
                    binding,
                    support: vec![*id],
                })
            })
            .collect()
    }

    /// Retract the fact whose statement structurally equals `statement`.
    ///
    /// The fact loses its directly-asserted status. If no derivation
    /// justifies it either, it is removed, along with everything
    /// downstream that is left unsupported and unasserted. A fact that
    /// still has derivational support stays, demoted to derivation-only
    /// truth.
    ///
    /// Retracting an unknown statement is a no-op, and retraction is
    /// idempotent. Rules cannot be retracted.
    pub fn retract(&mut self, statement: &Statement) {
        debug!("retracting {statement}");
        let Some(id) = self.find_fact(statement) else {
            return;
        };
        let supported = match self.facts.get_mut(&id) {
            Some(fact) => {
                fact.asserted = false;
                !fact.supported_by.is_empty()
            }
            None => return,
        };
        if !supported {
            self.remove_cascade(Removal::Fact(id));
        }
    }

    /// Insert or merge a fact. `support` is `None` for a direct assertion
    /// and `Some` for a derivation.
    fn add_fact(&mut self, statement: Statement, support: Option<Support>) -> FactId {
        if let Some(id) = self.find_fact(&statement) {
            match support {
                Some(sup) => {
                    trace!("merging support into fact {statement}");
                    if let Some(fact) = self.facts.get_mut(&id) {
                        fact.supported_by.push(sup);
                    }
                    self.register_fact_support(id, sup);
                }
                None => {
                    if let Some(fact) = self.facts.get_mut(&id) {
                        fact.asserted = true;
                    }
                }
            }
            return id;
        }

        trace!("adding fact {statement}");
        let id = FactId(self.next_fact);
        self.next_fact += 1;
        let predicate = statement.predicate.clone();
        self.facts.insert(
            id,
            Fact {
                statement,
                asserted: support.is_none(),
                supported_by: support.into_iter().collect(),
                supports_facts: SmallVec::new(),
                supports_rules: SmallVec::new(),
            },
        );
        self.facts_by_pred.entry(predicate).or_default().insert(id);
        if let Some(sup) = support {
            self.register_fact_support(id, sup);
        }

        // Chain the new fact against a snapshot of the current rules; rules
        // derived along the way chain against all facts on their own
        // insertion.
        let rules: Vec<RuleId> = self.rules.keys().copied().collect();
        for rule in rules {
            self.infer(id, rule);
        }
        id
    }

    /// Insert or merge a rule; the counterpart of [`add_fact`].
    ///
    /// [`add_fact`]: KnowledgeBase::add_fact
    fn add_rule(
        &mut self,
        lhs: Vec<Statement>,
        rhs: Statement,
        support: Option<Support>,
    ) -> RuleId {
        if let Some(id) = self.find_rule(&lhs, &rhs) {
            match support {
                Some(sup) => {
                    trace!("merging support into rule {}", DisplayRule(&lhs, &rhs));
                    if let Some(rule) = self.rules.get_mut(&id) {
                        rule.supported_by.push(sup);
                    }
                    self.register_rule_support(id, sup);
                }
                None => {
                    if let Some(rule) = self.rules.get_mut(&id) {
                        rule.asserted = true;
                    }
                }
            }
            return id;
        }

        trace!("adding rule {}", DisplayRule(&lhs, &rhs));
        let id = RuleId(self.next_rule);
        self.next_rule += 1;
        self.rules.insert(
            id,
            Rule {
                lhs,
                rhs,
                asserted: support.is_none(),
                supported_by: support.into_iter().collect(),
                supports_facts: SmallVec::new(),
                supports_rules: SmallVec::new(),
            },
        );
        if let Some(sup) = support {
            self.register_rule_support(id, sup);
        }

        let facts: Vec<FactId> = self.facts.keys().copied().collect();
        for fact in facts {
            self.infer(fact, id);
        }
        id
    }

    /// Record, on both halves of `sup`, that they derived fact `derived`
    fn register_fact_support(&mut self, derived: FactId, sup: Support) {
        if let Some(fact) = self.facts.get_mut(&sup.fact) {
            fact.supports_facts.push(derived);
        }
        if let Some(rule) = self.rules.get_mut(&sup.rule) {
            rule.supports_facts.push(derived);
        }
    }

    /// Record, on both halves of `sup`, that they derived rule `derived`
    fn register_rule_support(&mut self, derived: RuleId, sup: Support) {
        if let Some(fact) = self.facts.get_mut(&sup.fact) {
            fact.supports_rules.push(derived);
        }
        if let Some(rule) = self.rules.get_mut(&sup.rule) {
            rule.supports_rules.push(derived);
        }
    }

    /// Single forward-chaining derivation step: unify the rule's first
    /// condition against the fact's statement. On success, either derive a
    /// partially-discharged rule (conditions remain) or a new fact (none
    /// remain), supported by this fact/rule pair. Unification failure has
    /// no effect at all.
    fn infer(&mut self, fact_id: FactId, rule_id: RuleId) {
        let (first, rest, rhs) = {
            let Some(rule) = self.rules.get(&rule_id) else {
                return;
            };
            let Some(first) = rule.lhs.first() else {
                return;
            };
            (first.clone(), rule.lhs[1..].to_vec(), rule.rhs.clone())
        };
        let statement = match self.facts.get(&fact_id) {
            Some(fact) => fact.statement.clone(),
            None => return,
        };

        let Some(binding) = unify(&first, &statement) else {
            return;
        };
        let consequent = instantiate_statement(&rhs, &binding);
        let support = Support {
            fact: fact_id,
            rule: rule_id,
        };
        if rest.is_empty() {
            trace!("derived fact {consequent} from {statement}");
            self.add_fact(consequent, Some(support));
        } else {
            let lhs: Vec<Statement> = rest
                .iter()
                .map(|condition| instantiate_statement(condition, &binding))
                .collect();
            trace!(
                "derived rule {} from {statement}",
                DisplayRule(&lhs, &consequent)
            );
            self.add_rule(lhs, consequent, Some(support));
        }
    }

    /// Remove an unsupported, unasserted entity and everything downstream
    /// that the removal leaves without justification. Worklist iteration
    /// keeps the traversal order explicit and the stack depth bounded.
    fn remove_cascade(&mut self, seed: Removal) {
        let mut worklist = vec![seed];
        while let Some(next) = worklist.pop() {
            match next {
                Removal::Fact(id) => self.remove_fact_entity(id, &mut worklist),
                Removal::Rule(id) => self.remove_rule_entity(id, &mut worklist),
            }
        }
    }

    fn remove_fact_entity(&mut self, id: FactId, worklist: &mut Vec<Removal>) {
        let Some(fact) = self.facts.shift_remove(&id) else {
            return;
        };
        debug!("removing fact {}", fact.statement);
        if let Some(ids) = self.facts_by_pred.get_mut(&fact.statement.predicate) {
            ids.shift_remove(&id);
        }
        for dependent in fact.supports_facts {
            if self.unlink_fact_from_fact(dependent, id) {
                self.enqueue_dead_fact(dependent, worklist);
            }
        }
        for dependent in fact.supports_rules {
            if self.unlink_rule_from_fact(dependent, id) {
                self.enqueue_dead_rule(dependent, worklist);
            }
        }
    }

    fn remove_rule_entity(&mut self, id: RuleId, worklist: &mut Vec<Removal>) {
        let Some(rule) = self.rules.shift_remove(&id) else {
            return;
        };
        debug!("removing rule {}", DisplayRule(&rule.lhs, &rule.rhs));
        for dependent in rule.supports_facts {
            if self.unlink_fact_from_rule(dependent, id) {
                self.enqueue_dead_fact(dependent, worklist);
            }
        }
        for dependent in rule.supports_rules {
            if self.unlink_rule_from_rule(dependent, id) {
                self.enqueue_dead_rule(dependent, worklist);
            }
        }
    }

    /// Drop from fact `dependent` every support pair whose fact half is
    /// `removed`, unregistering `dependent` from the rule half of each
    /// dropped pair. Returns true if any pair was dropped.
    fn unlink_fact_from_fact(&mut self, dependent: FactId, removed: FactId) -> bool {
        let mut dropped: SmallVec<[Support; 2]> = SmallVec::new();
        let Some(fact) = self.facts.get_mut(&dependent) else {
            return false;
        };
        fact.supported_by.retain(|sup| {
            if sup.fact == removed {
                dropped.push(*sup);
                false
            } else {
                true
            }
        });
        for sup in &dropped {
            if let Some(rule) = self.rules.get_mut(&sup.rule) {
                remove_occurrence(&mut rule.supports_facts, &dependent);
            }
        }
        !dropped.is_empty()
    }

    /// As [`unlink_fact_from_fact`], for a dependent rule.
    ///
    /// [`unlink_fact_from_fact`]: KnowledgeBase::unlink_fact_from_fact
    fn unlink_rule_from_fact(&mut self, dependent: RuleId, removed: FactId) -> bool {
        let mut dropped: SmallVec<[Support; 2]> = SmallVec::new();
        let Some(rule) = self.rules.get_mut(&dependent) else {
            return false;
        };
        rule.supported_by.retain(|sup| {
            if sup.fact == removed {
                dropped.push(*sup);
                false
            } else {
                true
            }
        });
        for sup in &dropped {
            if let Some(rule) = self.rules.get_mut(&sup.rule) {
                remove_occurrence(&mut rule.supports_rules, &dependent);
            }
        }
        !dropped.is_empty()
    }

    /// Drop from fact `dependent` every support pair whose rule half is
    /// `removed`, unregistering `dependent` from the fact half of each
    /// dropped pair. Returns true if any pair was dropped.
    fn unlink_fact_from_rule(&mut self, dependent: FactId, removed: RuleId) -> bool {
        let mut dropped: SmallVec<[Support; 2]> = SmallVec::new();
        let Some(fact) = self.facts.get_mut(&dependent) else {
            return false;
        };
        fact.supported_by.retain(|sup| {
            if sup.rule == removed {
                dropped.push(*sup);
                false
            } else {
                true
            }
        });
        for sup in &dropped {
            if let Some(fact) = self.facts.get_mut(&sup.fact) {
                remove_occurrence(&mut fact.supports_facts, &dependent);
            }
        }
        !dropped.is_empty()
    }

    /// As [`unlink_fact_from_rule`], for a dependent rule.
    ///
    /// [`unlink_fact_from_rule`]: KnowledgeBase::unlink_fact_from_rule
    fn unlink_rule_from_rule(&mut self, dependent: RuleId, removed: RuleId) -> bool {
        let mut dropped: SmallVec<[Support; 2]> = SmallVec::new();
        let Some(rule) = self.rules.get_mut(&dependent) else {
            return false;
        };
        rule.supported_by.retain(|sup| {
            if sup.rule == removed {
                dropped.push(*sup);
                false
            } else {
                true
            }
        });
        for sup in &dropped {
            if let Some(fact) = self.facts.get_mut(&sup.fact) {
                remove_occurrence(&mut fact.supports_rules, &dependent);
            }
        }
        !dropped.is_empty()
    }

    fn enqueue_dead_fact(&self, id: FactId, worklist: &mut Vec<Removal>) {
        if let Some(fact) = self.facts.get(&id) {
            if fact.supported_by.is_empty() && !fact.asserted {
                worklist.push(Removal::Fact(id));
            }
        }
    }

    fn enqueue_dead_rule(&self, id: RuleId, worklist: &mut Vec<Removal>) {
        if let Some(rule) = self.rules.get(&id) {
            if rule.supported_by.is_empty() && !rule.asserted {
                worklist.push(Removal::Rule(id));
            }
        }
    }
}

/// Remove one occurrence of `value` from `list`, preserving order
fn remove_occurrence<A: smallvec::Array>(list: &mut SmallVec<A>, value: &A::Item)
where
    A::Item: PartialEq,
{
    if let Some(pos) = list.iter().position(|item| item == value) {
        list.remove(pos);
    }
}

/// Renders rule conditions and consequent without needing a stored [`Rule`]
struct DisplayRule<'a>(&'a [Statement], &'a Statement);

impl fmt::Display for DisplayRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, condition) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{condition}")?;
        }
        write!(f, ") -> {}", self.1)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statement)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DisplayRule(&self.lhs, &self.rhs))
    }
}

impl fmt::Display for KnowledgeBase {
    /// All facts, then all rules, one entity per line, in insertion order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fact in self.facts.values() {
            writeln!(f, "fact: {fact}")?;
        }
        for rule in self.rules.values() {
            writeln!(f, "rule: {rule}")?;
        }
        Ok(())
    }
}
