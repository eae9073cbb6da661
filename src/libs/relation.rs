//! Relation declarations and the relation graph.
//!
//! A relation ties a field of the owning entity (a single related entity or a
//! collection of them) to a related table. Resolution copies the owner's value
//! under the relation *name* into the related table's *foreign key* column;
//! the action mask decides which CRUD operations cascade.

use crate::libs::mapper::{self, Row};
use crate::libs::messages::Message;
use crate::libs::schema::{describe, descriptor_of, Entity, EntityDescriptor};
use crate::msg_warning;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

/// Upper bound on how many relation hops a cascade follows.
pub const MAX_CASCADE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    pub fn is_collection(&self) -> bool {
        !matches!(self, RelationKind::OneToOne)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RelationKind::OneToOne => "one2one",
            RelationKind::OneToMany => "one2many",
            RelationKind::ManyToMany => "many2many",
        })
    }
}

/// One CRUD action a relation may cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Query,
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn mask(self) -> ActionMask {
        match self {
            Action::Query => ActionMask::QUERY,
            Action::Insert => ActionMask::INSERT,
            Action::Update => ActionMask::UPDATE,
            Action::Delete => ActionMask::DELETE,
        }
    }
}

/// Subset of {query, insert, update, delete}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionMask(u8);

impl ActionMask {
    pub const NONE: ActionMask = ActionMask(0);
    pub const QUERY: ActionMask = ActionMask(1);
    pub const INSERT: ActionMask = ActionMask(1 << 1);
    pub const UPDATE: ActionMask = ActionMask(1 << 2);
    pub const DELETE: ActionMask = ActionMask(1 << 3);
    pub const ALL: ActionMask = ActionMask(0b1111);

    pub fn contains(self, other: ActionMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn allows(self, action: Action) -> bool {
        self.contains(action.mask())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses names such as `"query_insert"` or `"query|update|delete"`.
    pub fn parse(text: &str) -> Option<ActionMask> {
        let mut mask = ActionMask::NONE;
        for token in text.split(|c: char| c == '_' || c == '|' || c == ',' || c.is_whitespace()) {
            mask |= match token.to_ascii_lowercase().as_str() {
                "" => continue,
                "query" => ActionMask::QUERY,
                "insert" => ActionMask::INSERT,
                "update" => ActionMask::UPDATE,
                "delete" => ActionMask::DELETE,
                _ => return None,
            };
        }
        Some(mask)
    }
}

impl BitOr for ActionMask {
    type Output = ActionMask;

    fn bitor(self, rhs: ActionMask) -> ActionMask {
        ActionMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ActionMask {
    fn bitor_assign(&mut self, rhs: ActionMask) {
        self.0 |= rhs.0;
    }
}

/// Declaration handed to the schema builder.
#[derive(Debug, Clone)]
pub struct Relation {
    name: String,
    foreign_key: String,
    actions: ActionMask,
}

impl Relation {
    /// `name` is the owner's column holding the key value, `foreign_key` the
    /// related table's column it is matched against. Cascades query and
    /// insert unless told otherwise.
    pub fn new(name: &str, foreign_key: &str) -> Self {
        Self {
            name: name.to_string(),
            foreign_key: foreign_key.to_string(),
            actions: ActionMask::QUERY | ActionMask::INSERT,
        }
    }

    pub fn actions(mut self, actions: ActionMask) -> Self {
        self.actions = actions;
        self
    }
}

#[derive(Clone)]
pub struct RelationDescriptor {
    name: String,
    foreign_key: String,
    kind: RelationKind,
    actions: ActionMask,
    related: fn() -> Arc<EntityDescriptor>,
}

impl RelationDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn actions(&self) -> ActionMask {
        self.actions
    }

    pub fn cascades(&self, action: Action) -> bool {
        self.actions.allows(action)
    }

    /// Resolved on demand so that mutually related entities can be declared.
    pub fn related_descriptor(&self) -> Arc<EntityDescriptor> {
        (self.related)()
    }
}

impl fmt::Debug for RelationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RelationDescriptor")
            .field("name", &self.name)
            .field("foreign_key", &self.foreign_key)
            .field("kind", &self.kind)
            .field("actions", &self.actions)
            .finish()
    }
}

/// Typed access to a relation-bearing field, erased over the related type.
pub(crate) trait RelationField<E>: Send + Sync {
    fn descriptor(&self) -> &RelationDescriptor;

    /// Marshals every related entity currently held by the owner.
    fn related_rows(&self, owner: &E, include_pk: bool) -> Vec<Row>;

    /// Unmarshals `rows` and stores them on the owner. Empty input leaves the field alone.
    fn attach(&self, owner: &mut E, rows: &[Row]);
}

pub(crate) struct OneField<E, R> {
    descriptor: RelationDescriptor,
    get: fn(&E) -> &Option<R>,
    set: fn(&mut E, Option<R>),
}

impl<E: Entity, R: Entity> OneField<E, R> {
    pub fn new(relation: Relation, get: fn(&E) -> &Option<R>, set: fn(&mut E, Option<R>)) -> Self {
        Self {
            descriptor: described(relation, RelationKind::OneToOne, descriptor_of::<R>),
            get,
            set,
        }
    }
}

impl<E: Entity, R: Entity> RelationField<E> for OneField<E, R> {
    fn descriptor(&self) -> &RelationDescriptor {
        &self.descriptor
    }

    fn related_rows(&self, owner: &E, include_pk: bool) -> Vec<Row> {
        let schema = describe::<R>();
        (self.get)(owner).iter().map(|related| mapper::to_row(&schema, related, include_pk)).collect()
    }

    fn attach(&self, owner: &mut E, rows: &[Row]) {
        if let Some(first) = rows.first() {
            (self.set)(owner, Some(mapper::from_row(&describe::<R>(), first)));
        }
    }
}

pub(crate) struct ManyField<E, R> {
    descriptor: RelationDescriptor,
    get: fn(&E) -> &Vec<R>,
    set: fn(&mut E, Vec<R>),
}

impl<E: Entity, R: Entity> ManyField<E, R> {
    pub fn new(relation: Relation, kind: RelationKind, get: fn(&E) -> &Vec<R>, set: fn(&mut E, Vec<R>)) -> Self {
        Self {
            descriptor: described(relation, kind, descriptor_of::<R>),
            get,
            set,
        }
    }
}

impl<E: Entity, R: Entity> RelationField<E> for ManyField<E, R> {
    fn descriptor(&self) -> &RelationDescriptor {
        &self.descriptor
    }

    fn related_rows(&self, owner: &E, include_pk: bool) -> Vec<Row> {
        let schema = describe::<R>();
        (self.get)(owner).iter().map(|related| mapper::to_row(&schema, related, include_pk)).collect()
    }

    fn attach(&self, owner: &mut E, rows: &[Row]) {
        if rows.is_empty() {
            return;
        }
        let schema = describe::<R>();
        (self.set)(owner, rows.iter().map(|row| mapper::from_row(&schema, row)).collect());
    }
}

fn described(relation: Relation, kind: RelationKind, related: fn() -> Arc<EntityDescriptor>) -> RelationDescriptor {
    RelationDescriptor {
        name: relation.name,
        foreign_key: relation.foreign_key,
        kind,
        actions: relation.actions,
        related,
    }
}

/// Directed edge from an owning table to a related table.
#[derive(Debug, Clone)]
pub struct RelationEdge {
    pub owner: String,
    pub related: String,
    pub relation: RelationDescriptor,
    /// False when the foreign key is not a column of the related table;
    /// cascades along such an edge are no-ops.
    pub valid: bool,
}

/// Relation graph over every table reachable from the registered entities.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    edges: Vec<RelationEdge>,
    descriptors: Vec<Arc<EntityDescriptor>>,
}

impl RelationGraph {
    /// Walks relations breadth-first, following related descriptors that were
    /// never registered themselves. Entities without a table are skipped.
    /// Nodes are entity descriptors, so types sharing a table each add their edges.
    pub fn build(roots: &[Arc<EntityDescriptor>]) -> Self {
        let mut edges = Vec::new();
        let mut descriptors = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<Arc<EntityDescriptor>> = roots.iter().cloned().collect();

        while let Some(descriptor) = queue.pop_front() {
            let Some(owner) = descriptor.table_name() else {
                continue;
            };
            if !seen.insert(Arc::as_ptr(&descriptor)) {
                continue;
            }
            descriptors.push(descriptor.clone());

            for relation in descriptor.relations() {
                let related = relation.related_descriptor();
                let Some(related_table) = related.table_name() else {
                    continue;
                };

                let valid = related.has_column(relation.foreign_key());
                if !valid {
                    msg_warning!(Message::UnknownForeignKey {
                        relation: relation.name().to_string(),
                        table: related_table.to_string(),
                        column: relation.foreign_key().to_string(),
                    });
                }

                edges.push(RelationEdge {
                    owner: owner.to_string(),
                    related: related_table.to_string(),
                    relation: relation.clone(),
                    valid,
                });
                queue.push_back(related);
            }
        }

        Self { edges, descriptors }
    }

    pub fn edges(&self) -> &[RelationEdge] {
        &self.edges
    }

    /// Every tabled descriptor the walk visited, registered ones first.
    pub fn descriptors(&self) -> &[Arc<EntityDescriptor>] {
        &self.descriptors
    }

    /// Whether `descriptor` itself was walked, not just another type on its table.
    pub fn covers(&self, descriptor: &Arc<EntityDescriptor>) -> bool {
        self.descriptors.iter().any(|d| Arc::ptr_eq(d, descriptor))
    }

    pub fn edges_from<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a RelationEdge> + 'a {
        self.edges.iter().filter(move |edge| edge.owner.eq_ignore_ascii_case(table))
    }

    /// Tables an `action` on `table` cascades into, nearest first, bounded by
    /// [`MAX_CASCADE_DEPTH`]. The starting table itself is never listed.
    pub fn reachable(&self, table: &str, action: Action) -> Vec<String> {
        let first = self
            .edges_from(table)
            .filter(|edge| edge.valid && edge.relation.cascades(action))
            .map(|edge| edge.related.clone())
            .collect();
        self.walk(table, first, action)
    }

    /// Like [`RelationGraph::reachable`], but the first hop follows only the
    /// relations `descriptor` declares, not those of other types on its table.
    pub fn reachable_from(&self, descriptor: &EntityDescriptor, action: Action) -> Vec<String> {
        let Some(table) = descriptor.table_name() else {
            return Vec::new();
        };
        let first = descriptor
            .relations()
            .iter()
            .filter(|relation| relation.cascades(action))
            .filter_map(|relation| {
                let related = relation.related_descriptor();
                let related_table = related.table_name()?;
                related.has_column(relation.foreign_key()).then(|| related_table.to_string())
            })
            .collect();
        self.walk(table, first, action)
    }

    fn walk(&self, table: &str, first: Vec<String>, action: Action) -> Vec<String> {
        let mut found = Vec::new();
        let mut seen: HashSet<String> = HashSet::from([table.to_ascii_lowercase()]);
        let mut queue = VecDeque::new();

        for related in first {
            if seen.insert(related.to_ascii_lowercase()) {
                found.push(related.clone());
                queue.push_back((related, 1usize));
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= MAX_CASCADE_DEPTH {
                msg_warning!(Message::CascadeDepthReached(current));
                continue;
            }
            for edge in self.edges_from(&current) {
                if !edge.valid || !edge.relation.cascades(action) || !seen.insert(edge.related.to_ascii_lowercase()) {
                    continue;
                }
                found.push(edge.related.clone());
                queue.push_back((edge.related.clone(), depth + 1));
            }
        }

        found
    }
}
