//! Resolves record types to schemas.
//!
//! Derivation runs in two phases over every record type reachable through
//! relations. The skeleton phase parses declarations and stores each
//! skeleton before recursing into its relation targets, so cycles find the
//! in-progress entry. The full-shape phase resolves relation descriptors
//! against the skeletons (they only need the target's id and join shapes)
//! and concatenates the per-field projections into full shapes. Nothing is
//! published unless both phases succeed for every pending schema.

use crate::annotation::{self, Annotation};
use crate::error::SchemaError;
use crate::field::{FieldDescriptor, FieldKind, IdSpec, Relation, Target};
use crate::naming::{default_alias, is_storage_identifier, is_wire_name, snake};
use crate::resource::{Cardinality, Declaration, MemberDecl, RecordRef, Resource, ResourceInfo, Role, TypeDecl};
use crate::schema::Schema;
use crate::shape::{JoinTag, Shape, ShapeKey, ShapeKind};
use crate::value::{Primitive, Value};
use crate::{debug, info};
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

#[derive(Default)]
pub struct Registry {
    schemas: RwLock<HashMap<TypeId, Arc<Schema>>>,
    registering: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Arc<Schema>>> {
        self.schemas.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Arc<Schema>>> {
        self.schemas.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get<T: Resource>(&self) -> Option<Arc<Schema>> {
        self.get_by_id(TypeId::of::<T>())
    }

    pub fn get_by_id(&self, type_id: TypeId) -> Option<Arc<Schema>> {
        self.read().get(&type_id).cloned()
    }

    pub fn by_wire_type(&self, wire_type: &str) -> Option<Arc<Schema>> {
        self.read().values().find(|s| s.wire_type == wire_type).cloned()
    }

    pub fn schemas(&self) -> Vec<Arc<Schema>> {
        let mut all: Vec<Arc<Schema>> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.wire_type.cmp(&b.wire_type));
        all
    }

    pub fn register<T: Resource>(&self) -> Result<Arc<Schema>, SchemaError> {
        self.register_ref(RecordRef::of::<T>())
    }

    /// Idempotent: every call for the same type returns the same `Arc`.
    pub fn register_ref(&self, record: RecordRef) -> Result<Arc<Schema>, SchemaError> {
        let type_id = (record.type_id)();
        if let Some(schema) = self.get_by_id(type_id) {
            return Ok(schema);
        }
        let _guard = self.registering.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = self.get_by_id(type_id) {
            return Ok(schema);
        }

        let (root, derived) = {
            let published = self.read();
            let mut derivation = Derivation::new(&published);
            derivation.skeleton(record)?;
            derivation.finish()?
        };

        let mut schemas = self.write();
        for schema in derived {
            info!("Registered schema {} (table {} as {}, {} fields)", schema.wire_type, schema.table, schema.alias, schema.fields.len());
            schemas.insert(schema.type_id, schema);
        }
        Ok(root)
    }

    /// Registers every type that derived `Resource`.
    pub fn register_all(&self) -> Result<Vec<Arc<Schema>>, SchemaError> {
        let mut registered = Vec::new();
        for info in inventory::iter::<ResourceInfo> {
            debug!("Registering {} from inventory", info.name);
            registered.push(self.register_ref((info.record)())?);
        }
        Ok(registered)
    }
}

enum PendingKind {
    Id(Primitive),
    Attribute(Primitive),
    Timestamp(Role),
    BelongsTo(RecordRef),
    Has { target: RecordRef, cardinality: Cardinality },
}

struct PendingField {
    ident: &'static str,
    wire_name: String,
    column: String,
    kind: PendingKind,
    nullable: bool,
    unique: bool,
    omit_empty: bool,
    readonly: bool,
    nosort: bool,
    nofilter: bool,
    default: Option<(String, Value)>,
    /// Has relations: the belongs-to field on the target.
    foreign_key: Option<String>,
}

impl PendingField {
    /// Member names this field occupies in the Persistence shape.
    fn persistence_names(&self) -> Vec<String> {
        match self.kind {
            PendingKind::BelongsTo(_) => vec![self.column.clone(), self.ident.to_string()],
            PendingKind::Has { .. } => vec![self.ident.to_string()],
            _ => vec![self.column.clone()],
        }
    }
}

struct Skeleton {
    record: RecordRef,
    type_id: TypeId,
    wire_type: String,
    table: String,
    alias: String,
    fields: Vec<PendingField>,
    id_index: usize,
    target: Arc<Target>,
}

struct Derivation<'r> {
    published: &'r HashMap<TypeId, Arc<Schema>>,
    pending: Vec<Skeleton>,
    index: HashMap<TypeId, usize>,
}

fn allowed_options(role: Role) -> &'static [&'static str] {
    match role {
        Role::Id => &["column"],
        Role::Attr => &["column", "default", "notnull", "unique", "omitempty", "readonly", "nosort", "nofilter"],
        Role::BelongsTo => &["column", "notnull", "omitempty"],
        Role::Has => &["fk", "omitempty"],
        Role::Expires | Role::Created | Role::Updated => &["column", "omitempty", "nosort", "nofilter"],
        Role::Many2Many => &[],
    }
}

const VALUED_OPTIONS: [&str; 3] = ["column", "default", "fk"];

impl<'r> Derivation<'r> {
    fn new(published: &'r HashMap<TypeId, Arc<Schema>>) -> Self {
        Derivation { published, pending: Vec::new(), index: HashMap::new() }
    }

    /// Phase one: parse `record` and everything reachable from it.
    fn skeleton(&mut self, record: RecordRef) -> Result<(), SchemaError> {
        let type_id = (record.type_id)();
        if self.published.contains_key(&type_id) || self.index.contains_key(&type_id) {
            return Ok(());
        }
        let declaration = (record.declaration)();
        let skeleton = parse_declaration(record, type_id, &declaration)?;
        debug!("Skeleton {} with {} fields", skeleton.wire_type, skeleton.fields.len());

        let targets: Vec<RecordRef> = skeleton
            .fields
            .iter()
            .filter_map(|f| match f.kind {
                PendingKind::BelongsTo(target) | PendingKind::Has { target, .. } => Some(target),
                _ => None,
            })
            .collect();
        self.index.insert(type_id, self.pending.len());
        self.pending.push(skeleton);

        for target in targets {
            self.skeleton(target)?;
        }
        Ok(())
    }

    fn target_of(&self, type_id: TypeId) -> Option<Arc<Target>> {
        match self.index.get(&type_id) {
            Some(&idx) => Some(self.pending[idx].target.clone()),
            None => self.published.get(&type_id).map(|s| s.target().clone()),
        }
    }

    /// Foreign-key column of the belongs-to field `fk` on `target` pointing back at `owner`.
    fn inverse_column(&self, owner: TypeId, target: TypeId, fk: &str) -> Option<String> {
        match self.index.get(&target) {
            Some(&idx) => self.pending[idx].fields.iter().find_map(|f| match f.kind {
                PendingKind::BelongsTo(r) if f.ident == fk && (r.type_id)() == owner => Some(f.column.clone()),
                _ => None,
            }),
            None => self.published.get(&target).and_then(|s| {
                s.field_by_ident(fk).and_then(|f| match &f.kind {
                    FieldKind::BelongsTo(rel) if rel.target.type_id == owner => Some(rel.foreign_key.clone()),
                    _ => None,
                })
            }),
        }
    }

    /// Phase two: resolve relations and generate full shapes for every pending skeleton.
    fn finish(self) -> Result<(Arc<Schema>, Vec<Arc<Schema>>), SchemaError> {
        let mut wire_types: HashMap<String, &'static str> =
            self.published.values().map(|s| (s.wire_type.clone(), s.type_name)).collect();
        for skeleton in &self.pending {
            if let Some(first) = wire_types.insert(skeleton.wire_type.clone(), skeleton.record.type_name) {
                return Err(SchemaError::DuplicateWireType {
                    wire_type: skeleton.wire_type.clone(),
                    first: first.to_string(),
                    second: skeleton.record.type_name.to_string(),
                });
            }
        }

        let mut schemas = Vec::with_capacity(self.pending.len());
        for skeleton in &self.pending {
            let fields = skeleton
                .fields
                .iter()
                .map(|f| self.descriptor(skeleton, f))
                .collect::<Result<Vec<_>, _>>()?;
            let shape = |kind: ShapeKind| Shape {
                key: ShapeKey { record: skeleton.type_id, kind },
                name: format!("{}{}", skeleton.record.type_name, kind.suffix()),
                members: fields.iter().flat_map(|f| f.project(kind, &skeleton.wire_type)).collect(),
            };
            let domain = shape(ShapeKind::Domain);
            let wire = shape(ShapeKind::Wire);
            let persistence = shape(ShapeKind::Persistence);
            schemas.push(Arc::new(Schema {
                type_id: skeleton.type_id,
                type_name: skeleton.record.type_name,
                wire_type: skeleton.wire_type.clone(),
                table: skeleton.table.clone(),
                alias: skeleton.alias.clone(),
                id_index: skeleton.id_index,
                target: skeleton.target.clone(),
                fields,
                domain,
                wire,
                persistence,
            }));
        }
        let root = schemas.first().cloned().ok_or_else(|| SchemaError::MissingId { record: "<empty registration>".into() })?;
        Ok((root, schemas))
    }

    fn descriptor(&self, skeleton: &Skeleton, f: &PendingField) -> Result<FieldDescriptor, SchemaError> {
        let record = skeleton.record.type_name;
        let kind = match &f.kind {
            PendingKind::Id(p) => FieldKind::Id { primitive: *p },
            PendingKind::Attribute(p) => FieldKind::Attribute { primitive: *p },
            PendingKind::Timestamp(Role::Expires) => FieldKind::Expiring,
            PendingKind::Timestamp(Role::Created) => FieldKind::Created,
            PendingKind::Timestamp(_) => FieldKind::Updated,
            PendingKind::BelongsTo(r) => {
                let target = self.resolve(record, f.ident, "belongs-to", r)?;
                FieldKind::BelongsTo(Relation {
                    join: JoinTag::BelongsTo { local: f.column.clone(), foreign: target.id.column.clone() },
                    target,
                    cardinality: Cardinality::One,
                    foreign_key: f.column.clone(),
                })
            }
            PendingKind::Has { target: r, cardinality } => {
                let target = self.resolve(record, f.ident, "has", r)?;
                let fk = f.foreign_key.clone().unwrap_or_else(|| snake(record));
                let foreign = self.inverse_column(skeleton.type_id, target.type_id, &fk).ok_or_else(|| {
                    SchemaError::MissingInverse {
                        record: record.to_string(),
                        field: f.ident.to_string(),
                        target: target.type_name.to_string(),
                        foreign_key: fk.clone(),
                    }
                })?;
                let owner_id = skeleton.fields[skeleton.id_index].column.clone();
                FieldKind::Has(Relation {
                    join: JoinTag::Has { local: owner_id, foreign },
                    target,
                    cardinality: *cardinality,
                    foreign_key: fk,
                })
            }
        };
        let relation = matches!(kind, FieldKind::BelongsTo(_) | FieldKind::Has(_));
        let id = matches!(kind, FieldKind::Id { .. });
        let auto = matches!(kind, FieldKind::Created | FieldKind::Updated);
        Ok(FieldDescriptor {
            record,
            ident: f.ident,
            wire_name: f.wire_name.clone(),
            column: f.column.clone(),
            nullable: f.nullable,
            writable: !(id || auto || f.readonly),
            sortable: !relation && !f.nosort,
            filterable: !relation && !f.nofilter,
            unique: f.unique || id,
            omit_empty: f.omit_empty,
            default: f.default.clone(),
            kind,
        })
    }

    fn resolve(&self, record: &str, field: &str, role: &'static str, target: &RecordRef) -> Result<Arc<Target>, SchemaError> {
        self.target_of((target.type_id)()).ok_or_else(|| SchemaError::NotARecord {
            record: record.to_string(),
            field: field.to_string(),
            role,
            found: target.type_name.to_string(),
        })
    }
}

fn parse_declaration(record: RecordRef, type_id: TypeId, decl: &Declaration) -> Result<Skeleton, SchemaError> {
    let name = record.type_name.to_string();
    let wire_type = decl.name.map(str::to_string).unwrap_or_else(|| snake(record.type_name));
    if !is_wire_name(&wire_type) {
        return Err(SchemaError::InvalidIdentifier { record: name, what: "wire type", value: wire_type });
    }
    let table = decl.table.map(str::to_string).unwrap_or_else(|| snake(record.type_name));
    if !is_storage_identifier(&table) {
        return Err(SchemaError::InvalidIdentifier { record: name, what: "table", value: table });
    }
    let alias = decl.alias.map(str::to_string).unwrap_or_else(|| default_alias(&table));
    if !is_storage_identifier(&alias) {
        return Err(SchemaError::InvalidIdentifier { record: name, what: "alias", value: alias });
    }
    if alias == table {
        return Err(SchemaError::AliasEqualsTable { record: name, alias });
    }

    let mut fields: Vec<PendingField> = Vec::with_capacity(decl.members.len());
    let mut id_index: Option<usize> = None;
    let mut expiring: Option<&'static str> = None;
    let mut columns: HashMap<String, &'static str> = HashMap::new();
    for member in &decl.members {
        let field = parse_member(record.type_name, member)?;
        for column in field.persistence_names() {
            if let Some(prev) = columns.insert(column.clone(), field.ident) {
                return Err(SchemaError::DuplicateColumn { record: name, column, first: prev.to_string(), second: field.ident.to_string() });
            }
        }
        if let Some(prev) = fields.iter().find(|f| f.wire_name == field.wire_name) {
            return Err(SchemaError::DuplicateWireName {
                record: name,
                name: field.wire_name.clone(),
                first: prev.ident.to_string(),
                second: field.ident.to_string(),
            });
        }
        match field.kind {
            PendingKind::Id(_) => {
                if let Some(prev) = id_index {
                    return Err(SchemaError::DuplicateId {
                        record: name,
                        first: fields[prev].ident.to_string(),
                        second: field.ident.to_string(),
                    });
                }
                id_index = Some(fields.len());
            }
            PendingKind::Timestamp(Role::Expires) => {
                if let Some(prev) = expiring {
                    return Err(SchemaError::MultipleExpiring { record: name, first: prev.to_string(), second: field.ident.to_string() });
                }
                expiring = Some(field.ident);
            }
            _ => {}
        }
        fields.push(field);
    }
    let id_index = id_index.ok_or_else(|| SchemaError::MissingId { record: name.clone() })?;

    let id = &fields[id_index];
    let id_spec = match id.kind {
        PendingKind::Id(primitive) => IdSpec { ident: id.ident, wire_name: id.wire_name.clone(), column: id.column.clone(), primitive },
        _ => return Err(SchemaError::MissingId { record: name }),
    };
    let target = Arc::new(Target::new(type_id, record.type_name, wire_type.clone(), table.clone(), alias.clone(), id_spec));
    Ok(Skeleton { record, type_id, wire_type, table, alias, fields, id_index, target })
}

fn parse_member(record: &'static str, member: &MemberDecl) -> Result<PendingField, SchemaError> {
    let field = member.ident;
    let err_field = || (record.to_string(), field.to_string());
    if member.role == Role::Many2Many {
        let (record, field) = err_field();
        return Err(SchemaError::ManyToMany { record, field });
    }
    let ann: Annotation = annotation::parse(member.annotation).map_err(|e| {
        let (record, field) = err_field();
        SchemaError::InvalidAnnotation { record, field, reason: e.to_string() }
    })?;
    let allowed = allowed_options(member.role);
    for (key, value) in &ann.options {
        if !allowed.contains(&key.as_str()) {
            let (record, field) = err_field();
            return Err(SchemaError::OptionNotAllowed { record, field, option: key.clone(), role: member.role.label() });
        }
        let valued = VALUED_OPTIONS.contains(&key.as_str());
        if valued != value.is_some() {
            let (record, field) = err_field();
            let reason = if valued { format!("option `{key}` needs a value") } else { format!("option `{key}` takes no value") };
            return Err(SchemaError::InvalidAnnotation { record, field, reason });
        }
    }

    let wire_name = ann.name.clone().unwrap_or_else(|| field.to_string());
    if !is_wire_name(&wire_name) {
        let (record, field) = err_field();
        return Err(SchemaError::InvalidWireName { record, field, name: wire_name });
    }
    let found = format!("{:?}", member.ty);
    let notnull = ann.has("notnull");

    let (kind, nullable, default_column) = match (member.role, member.ty) {
        (Role::Id, TypeDecl::Primitive { primitive, optional: false })
            if primitive.is_integer() || primitive == Primitive::String =>
        {
            (PendingKind::Id(primitive), false, field.to_string())
        }
        (Role::Id, _) => {
            let (record, field) = err_field();
            return Err(SchemaError::UnsupportedIdType { record, field, found });
        }
        (Role::Attr, TypeDecl::Primitive { primitive, optional }) => {
            (PendingKind::Attribute(primitive), optional && !notnull, field.to_string())
        }
        (Role::Attr, _) => {
            let (record, field) = err_field();
            return Err(SchemaError::UnsupportedAttributeType { record, field, found });
        }
        (Role::Expires | Role::Created | Role::Updated, TypeDecl::Primitive { primitive: Primitive::Time, optional }) => {
            (PendingKind::Timestamp(member.role), optional, field.to_string())
        }
        (Role::Expires | Role::Created | Role::Updated, _) => {
            let (record, field) = err_field();
            return Err(SchemaError::NotATimestamp { record, field, role: member.role.label(), found });
        }
        (Role::BelongsTo, TypeDecl::Record { cardinality: Cardinality::Many, .. }) => {
            let (record, field) = err_field();
            return Err(SchemaError::CollectionBelongsTo { record, field });
        }
        (Role::BelongsTo, TypeDecl::Record { target, optional, .. }) => {
            (PendingKind::BelongsTo(target), optional && !notnull, format!("{field}_id"))
        }
        (Role::Has, TypeDecl::Record { cardinality: Cardinality::One, optional: false, .. }) => {
            let (record, field) = err_field();
            return Err(SchemaError::RequiredHasOne { record, field });
        }
        (Role::Has, TypeDecl::Record { target, cardinality, .. }) => {
            (PendingKind::Has { target, cardinality }, true, field.to_string())
        }
        (role, _) => {
            let (record, field) = err_field();
            return Err(SchemaError::NotARecord { record, field, role: role.label(), found });
        }
    };

    let column = ann.value("column").map(str::to_string).unwrap_or(default_column);
    if !is_storage_identifier(&column) {
        return Err(SchemaError::InvalidIdentifier { record: record.to_string(), what: "column", value: column });
    }

    let default = match (ann.value("default"), &kind) {
        (Some(raw), PendingKind::Attribute(primitive)) => match primitive.parse(raw) {
            Ok(value) => Some((raw.to_string(), value)),
            Err(_) => {
                let (record, field) = err_field();
                return Err(SchemaError::InvalidDefault { record, field, value: raw.to_string(), primitive: primitive.name() });
            }
        },
        _ => None,
    };

    Ok(PendingField {
        ident: field,
        wire_name,
        column,
        nullable,
        unique: ann.has("unique"),
        omit_empty: ann.has("omitempty"),
        readonly: ann.has("readonly"),
        nosort: ann.has("nosort"),
        nofilter: ann.has("nofilter"),
        default,
        foreign_key: ann.value("fk").map(str::to_string),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::shape::{MemberType, Tag, WireTag};

    #[test]
    fn registration_is_idempotent() {
        let registry = Registry::new();
        let first = registry.register::<Post>().unwrap();
        let second = registry.register::<Post>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let author = registry.get::<Author>().expect("related types register transitively");
        assert!(Arc::ptr_eq(&author, &registry.register::<Author>().unwrap()));
        assert!(registry.get::<Comment>().is_some());
    }

    #[test]
    fn self_relation_terminates_with_id_only_join_shapes() {
        let registry = Registry::new();
        let category = registry.register::<Category>().unwrap();
        for kind in [ShapeKind::WireJoin, ShapeKind::PersistenceJoin] {
            let join = category.shape(kind);
            assert_eq!(join.members.len(), 1, "{kind:?}");
        }
        let parent = category.shape(ShapeKind::Persistence).member("parent").unwrap();
        match &parent.ty {
            MemberType::One { target, nullable, .. } => {
                assert_eq!(*target, category.shape(ShapeKind::PersistenceJoin).key);
                assert!(*nullable);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(category.shape(ShapeKind::Persistence).member("parent_id").is_some());
        let children = category.shape(ShapeKind::Wire).member("children").unwrap();
        assert!(matches!(children.ty, MemberType::Many { .. }));
    }

    #[test]
    fn mutual_relations_register_both_sides() {
        let registry = Registry::new();
        let person = registry.register::<Person>().unwrap();
        let passport = registry.get::<Passport>().unwrap();
        let rel = person.field("passport").and_then(FieldDescriptor::relation).unwrap();
        assert_eq!(rel.target.type_id, passport.type_id);
        assert_eq!(rel.join, JoinTag::Has { local: "id".into(), foreign: "holder_id".into() });
        assert_eq!(passport.shape(ShapeKind::WireJoin).members.len(), 1);
    }

    #[test]
    fn wire_shape_members_are_annotated() {
        let registry = Registry::new();
        let post = registry.register::<Post>().unwrap();
        let wire = post.shape(ShapeKind::Wire);
        assert_eq!(wire.name, "PostWire");
        assert_eq!(wire.members[0].tag, Tag::Wire(WireTag::Primary { wire_type: "posts".into() }));
        let title = wire.member("title").unwrap();
        assert_eq!(title.tag, Tag::Wire(WireTag::Attribute { name: "title".into(), omit_empty: false }));
        let names: Vec<&str> = post.shape(ShapeKind::Persistence).members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "views", "author_id", "author", "comments", "created_at", "expires_at"]);
    }

    #[test]
    fn flags_follow_roles_and_options() {
        let registry = Registry::new();
        let post = registry.register::<Post>().unwrap();
        let id = post.id();
        assert!(!id.writable && id.sortable && id.filterable);
        let views = post.field("views").unwrap();
        assert_eq!(views.default, Some(("0".to_string(), Value::Int(0))));
        let author = post.field("author").unwrap();
        assert!(!author.sortable && !author.filterable && !author.nullable);
        assert!(!post.field("created-at").unwrap().writable);
        assert!(post.expiring().is_some());
    }

    #[test]
    fn invalid_declarations_are_rejected_without_publishing() {
        let registry = Registry::new();
        assert!(matches!(registry.register::<NoId>(), Err(SchemaError::MissingId { .. })));
        assert!(matches!(registry.register::<TwoExpiring>(), Err(SchemaError::MultipleExpiring { .. })));
        assert!(matches!(registry.register::<BadAlias>(), Err(SchemaError::AliasEqualsTable { .. })));
        assert!(matches!(registry.register::<BadOption>(), Err(SchemaError::OptionNotAllowed { .. })));
        assert!(matches!(registry.register::<NamedAttr>(), Err(SchemaError::UnsupportedAttributeType { .. })));
        assert!(matches!(registry.register::<FloatId>(), Err(SchemaError::UnsupportedIdType { .. })));
        assert!(matches!(registry.register::<DupWire>(), Err(SchemaError::DuplicateWireName { .. })));
        assert!(matches!(registry.register::<Tagged>(), Err(SchemaError::ManyToMany { .. })));
        let err = registry.register::<SharedColumn>().unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateColumn { record: "SharedColumn".into(), column: "shared".into(), first: "a".into(), second: "b".into() }
        );
        assert!(matches!(registry.register::<ShadowedForeignKey>(), Err(SchemaError::DuplicateColumn { .. })));
        assert!(matches!(registry.register::<ShadowedRelation>(), Err(SchemaError::DuplicateColumn { .. })));
        assert_eq!(
            registry.register::<BoxedHasOne>().unwrap_err(),
            SchemaError::RequiredHasOne { record: "BoxedHasOne".into(), field: "passport".into() }
        );
        assert!(registry.schemas().is_empty());
    }

    #[test]
    fn failing_relation_target_discards_the_whole_registration() {
        let registry = Registry::new();
        let err = registry.register::<Orphan>().unwrap_err();
        assert!(matches!(err, SchemaError::MissingInverse { .. }), "{err}");
        assert!(registry.get::<Orphan>().is_none());
        assert!(registry.get::<Author>().is_none());
    }
}
