//! Relation cascades.
//!
//! The owner's value under the relation *name* is copied into, or matched
//! against, the related table's *foreign key* column. A relation whose key
//! value cannot be found is skipped with a warning; storage failures abort the
//! surrounding operation. Insert, update and query cascades reach the directly
//! related tables. Deletes follow chained relations through the relation graph.

use crate::db::crud;
use crate::libs::error::{OrmError, OrmResult};
use crate::libs::mapper::Row;
use crate::libs::messages::Message;
use crate::libs::relation::{Action, RelationDescriptor, RelationGraph, MAX_CASCADE_DEPTH};
use crate::libs::schema::{Entity, EntityDescriptor, EntitySchema};
use crate::libs::value::Value;
use crate::msg_warning;
use rusqlite::Connection;
use std::collections::{HashSet, VecDeque};

/// Related table and the key value a cascade uses.
struct Target {
    table: String,
    key: Value,
}

fn target(relation: &RelationDescriptor, owner: &Row) -> OrmResult<Target> {
    let related = relation.related_descriptor();
    let table = related.require_table()?.to_string();

    if !related.has_column(relation.foreign_key()) {
        return Err(OrmError::UnknownForeignKey {
            relation: relation.name().to_string(),
            table,
            column: relation.foreign_key().to_string(),
        });
    }

    match owner.get(relation.name()) {
        Some(key) if !key.is_null() => Ok(Target { table, key: key.clone() }),
        _ => Err(OrmError::MissingForeignKeyValue {
            relation: relation.name().to_string(),
        }),
    }
}

fn skipped(relation: &RelationDescriptor, error: OrmError) {
    msg_warning!(Message::CascadeSkipped {
        relation: relation.name().to_string(),
        reason: error.to_string(),
    });
}

/// Inserts every related entity the owner holds, stamping each with the owner's key.
///
/// `owner` is the owner's full row as stored, including a generated key.
pub(crate) fn insert_related<E: Entity>(conn: &Connection, schema: &EntitySchema<E>, entity: &E, owner: &Row, auto_key: bool) -> OrmResult<()> {
    for field in &schema.relations {
        let relation = field.descriptor();
        if !relation.cascades(Action::Insert) {
            continue;
        }
        let target = match target(relation, owner) {
            Ok(target) => target,
            Err(error) => {
                skipped(relation, error);
                continue;
            }
        };

        for mut row in field.related_rows(entity, !auto_key) {
            row.set(relation.foreign_key(), target.key.clone());
            crud::insert_row(conn, &target.table, &row)?;
        }
    }
    Ok(())
}

/// Updates each related entity in place, matched by foreign key and, when the
/// related table has its own primary key, by that key too.
pub(crate) fn update_related<E: Entity>(conn: &Connection, schema: &EntitySchema<E>, entity: &E, owner: &Row) -> OrmResult<()> {
    for field in &schema.relations {
        let relation = field.descriptor();
        if !relation.cascades(Action::Update) {
            continue;
        }
        let target = match target(relation, owner) {
            Ok(target) => target,
            Err(error) => {
                skipped(relation, error);
                continue;
            }
        };

        let related = relation.related_descriptor();
        let related_pk = related.primary_key().filter(|pk| !pk.eq_ignore_ascii_case(relation.foreign_key()));

        for mut row in field.related_rows(entity, true) {
            row.set(relation.foreign_key(), target.key.clone());
            let mut keys = vec![relation.foreign_key()];
            if let Some(pk) = related_pk.filter(|pk| row.contains(pk)) {
                keys.push(pk);
            }
            crud::update_row(conn, &target.table, &row, &keys, &[])?;
        }
    }
    Ok(())
}

/// Loads related rows for every relation with the query bit and attaches them.
pub(crate) fn attach_related<E: Entity>(conn: &Connection, schema: &EntitySchema<E>, entity: &mut E, owner: &Row) -> OrmResult<()> {
    for field in &schema.relations {
        let relation = field.descriptor();
        if !relation.cascades(Action::Query) {
            continue;
        }
        let target = match target(relation, owner) {
            Ok(target) => target,
            Err(error) => {
                skipped(relation, error);
                continue;
            }
        };

        let rows = crud::select_eq(conn, &target.table, relation.foreign_key(), &target.key)?;
        field.attach(entity, &rows);
    }
    Ok(())
}

/// Deletes the rows that depend on the already-deleted `owner` row of `descriptor`'s table.
///
/// The first hop follows the relations `descriptor` declares. After that the
/// graph is walked breadth-first: rows removed from a related table are
/// themselves treated as owners for that table's delete-enabled relations,
/// up to [`MAX_CASCADE_DEPTH`] hops. Returns how many related rows went.
pub(crate) fn delete_related(conn: &Connection, graph: &RelationGraph, descriptor: &EntityDescriptor, owner: Row) -> OrmResult<usize> {
    let Some(table) = descriptor.table_name() else {
        return Ok(0);
    };
    let mut deleted = 0;
    let mut visited: HashSet<(String, String, String)> = HashSet::new();
    let mut queue = VecDeque::from([(table.to_string(), owner, 0usize)]);

    while let Some((table, row, depth)) = queue.pop_front() {
        let relations: Vec<RelationDescriptor> = if depth == 0 {
            descriptor.relations().to_vec()
        } else {
            graph.edges_from(&table).map(|edge| edge.relation.clone()).collect()
        };

        for relation in &relations {
            if !relation.cascades(Action::Delete) {
                continue;
            }
            let target = match target(relation, &row) {
                Ok(target) => target,
                Err(error) => {
                    skipped(relation, error);
                    continue;
                }
            };

            let visit = (target.table.to_ascii_lowercase(), relation.foreign_key().to_ascii_lowercase(), target.key.to_string());
            if !visited.insert(visit) {
                continue;
            }

            let chained = graph.edges_from(&target.table).any(|e| e.relation.cascades(Action::Delete));
            if chained {
                if depth + 1 < MAX_CASCADE_DEPTH {
                    for child in crud::select_eq(conn, &target.table, relation.foreign_key(), &target.key)? {
                        queue.push_back((target.table.clone(), child, depth + 1));
                    }
                } else {
                    msg_warning!(Message::CascadeDepthReached(target.table.clone()));
                }
            }

            deleted += crud::delete_eq(conn, &target.table, relation.foreign_key(), &target.key)?;
        }
    }

    Ok(deleted)
}
