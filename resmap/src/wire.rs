//! JSON:API resource objects for Wire and Wire-Join records.

use crate::error::ConversionError;
use crate::field::FieldKind;
use crate::schema::Schema;
use crate::shape::{Datum, Record, ShapeKind, Tag, WireTag};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Map;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceIdentifier>),
    One(Option<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: Linkage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub relationships: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<ResourceObject>),
    One(Option<ResourceObject>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub data: PrimaryData,
}

fn malformed(msg: impl Into<String>) -> ConversionError {
    ConversionError::Wire(msg.into())
}

fn wire_id(value: &Value) -> Option<String> {
    if value.is_null() { None } else { Some(value.to_string()) }
}

fn included(fieldset: Option<&[String]>, name: &str) -> bool {
    fieldset.map_or(true, |names| names.iter().any(|n| n == name))
}

fn identifier(schema: &Schema, field_name: &str, join: &Record) -> Result<ResourceIdentifier, ConversionError> {
    let rel = schema
        .field(field_name)
        .and_then(|f| f.relation())
        .ok_or_else(|| malformed(format!("`{field_name}` is not a relationship of {}", schema.wire_type)))?;
    let id = rel.target.read_join(ShapeKind::WireJoin, join)?;
    Ok(ResourceIdentifier { kind: rel.target.wire_type.clone(), id: id.to_string() })
}

/// Encodes a Wire or Wire-Join record of `schema`, keeping only members named in `fieldset` when given.
pub fn encode(schema: &Schema, record: &Record, fieldset: Option<&[String]>) -> Result<ResourceObject, ConversionError> {
    let kind = record.shape().kind;
    if !kind.is_wire() || record.shape().record != schema.type_id {
        record.expect_shape(schema.shape(ShapeKind::Wire))?;
    }
    let shape = schema.shape(kind);
    let mut object = ResourceObject { kind: schema.wire_type.clone(), id: None, attributes: Map::new(), relationships: Map::new() };
    for member in &shape.members {
        let datum = record
            .get(&member.name)
            .ok_or_else(|| ConversionError::MissingMember { shape: shape.name.clone(), member: member.name.clone() })?;
        match (&member.tag, datum) {
            (Tag::Wire(WireTag::Primary { .. }), Datum::Scalar(id)) => object.id = wire_id(id),
            (Tag::Wire(WireTag::Attribute { name, omit_empty }), Datum::Scalar(value)) => {
                if included(fieldset, name) && !(*omit_empty && value.is_empty()) {
                    object.attributes.insert(name.clone(), value.to_json());
                }
            }
            (Tag::Wire(WireTag::Relationship { name, omit_empty }), datum) => {
                if !included(fieldset, name) {
                    continue;
                }
                let data = match datum {
                    Datum::One(Some(join)) => Linkage::One(Some(identifier(schema, name, join)?)),
                    Datum::One(None) if *omit_empty => continue,
                    Datum::One(None) => Linkage::One(None),
                    Datum::Many(joins) if *omit_empty && joins.is_empty() => continue,
                    Datum::Many(joins) => {
                        Linkage::Many(joins.iter().map(|j| identifier(schema, name, j)).collect::<Result<_, _>>()?)
                    }
                    Datum::Scalar(v) => return Err(malformed(format!("relationship `{name}` holds {}", v.describe()))),
                };
                let relationship = serde_json::to_value(Relationship { data }).map_err(|e| malformed(e.to_string()))?;
                object.relationships.insert(name.clone(), relationship);
            }
            (tag, _) => return Err(malformed(format!("unexpected member {tag:?} in {}", shape.name))),
        }
    }
    Ok(object)
}

/// Decodes a resource object into a Wire record. A missing `id` leaves the id null, missing attributes stay null.
pub fn decode(schema: &Schema, object: &ResourceObject) -> Result<Record, ConversionError> {
    if object.kind != schema.wire_type {
        return Err(malformed(format!("expected type `{}`, found `{}`", schema.wire_type, object.kind)));
    }
    let shape = schema.shape(ShapeKind::Wire);
    for name in object.attributes.keys().chain(object.relationships.keys()) {
        if shape.member(name).map_or(true, |m| matches!(m.tag, Tag::Wire(WireTag::Primary { .. }))) {
            return Err(malformed(format!("{} has no member `{name}`", schema.wire_type)));
        }
    }

    let mut record = shape.instantiate();
    for field in &schema.fields {
        let name = &field.wire_name;
        match &field.kind {
            FieldKind::Id { primitive } => {
                let id = match &object.id {
                    Some(raw) => primitive.parse(raw).map_err(|e| malformed(format!("id: {e}")))?,
                    None => Value::Null,
                };
                record.set_scalar(name, id)?;
            }
            FieldKind::BelongsTo(rel) | FieldKind::Has(rel) => {
                let Some(json) = object.relationships.get(name) else { continue };
                let relationship: Relationship =
                    serde_json::from_value(json.clone()).map_err(|e| malformed(format!("relationship `{name}`: {e}")))?;
                let join = |ident: &ResourceIdentifier| {
                    if ident.kind != rel.target.wire_type {
                        return Err(malformed(format!("`{name}` expects type `{}`, found `{}`", rel.target.wire_type, ident.kind)));
                    }
                    let id = rel.target.id.primitive.parse(&ident.id).map_err(|e| malformed(format!("{name}: {e}")))?;
                    rel.target.join_record(ShapeKind::WireJoin, &id)
                };
                let datum = match relationship.data {
                    Linkage::One(None) => Datum::One(None),
                    Linkage::One(Some(ident)) => Datum::One(Some(Box::new(join(&ident)?))),
                    Linkage::Many(idents) => Datum::Many(idents.iter().map(join).collect::<Result<_, _>>()?),
                };
                record.set(name, datum)?;
            }
            _ => {
                let Some(json) = object.attributes.get(name) else { continue };
                let primitive = field.primitive().ok_or_else(|| malformed(format!("`{name}` is not an attribute")))?;
                let value = primitive.from_json(json).map_err(|e| malformed(format!("{name}: {e}")))?;
                record.set_scalar(name, value)?;
            }
        }
    }
    Ok(record)
}

pub fn document_one(schema: &Schema, record: &Record, fieldset: Option<&[String]>) -> Result<Document, ConversionError> {
    Ok(Document { data: PrimaryData::One(Some(encode(schema, record, fieldset)?)) })
}

pub fn document_many(schema: &Schema, records: &[Record], fieldset: Option<&[String]>) -> Result<Document, ConversionError> {
    let objects = records.iter().map(|r| encode(schema, r, fieldset)).collect::<Result<Vec<_>, _>>()?;
    Ok(Document { data: PrimaryData::Many(objects) })
}

/// Parses a `{"data": {...}}` request body holding a single resource object.
pub fn decode_document(schema: &Schema, body: &str) -> Result<Record, ConversionError> {
    let document: Document = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    match document.data {
        PrimaryData::One(Some(object)) => decode(schema, &object),
        _ => Err(malformed("expected a single resource object")),
    }
}
