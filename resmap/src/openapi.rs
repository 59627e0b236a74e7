use crate::schema::Schema;
use crate::shape::{Member, MemberType, Shape, ShapeKind, Tag, WireTag};
use crate::value::Primitive;
use std::sync::Arc;
use utoipa::openapi::schema::{
    ArrayBuilder, Components, ComponentsBuilder, KnownFormat, ObjectBuilder, Ref, Schema as OpenApiSchema, SchemaFormat, SchemaType, Type,
};
use utoipa::openapi::RefOr;

fn primitive_schema(primitive: Primitive, nullable: bool) -> OpenApiSchema {
    let (ty, format) = match primitive {
        Primitive::Bool => (Type::Boolean, None),
        Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::U8 | Primitive::U16 => (Type::Integer, Some(KnownFormat::Int32)),
        Primitive::I64 | Primitive::U32 | Primitive::U64 => (Type::Integer, Some(KnownFormat::Int64)),
        Primitive::F32 => (Type::Number, Some(KnownFormat::Float)),
        Primitive::F64 => (Type::Number, Some(KnownFormat::Double)),
        Primitive::String => (Type::String, None),
        Primitive::Time => (Type::String, Some(KnownFormat::DateTime)),
    };
    let schema_type = if nullable { SchemaType::from_iter([ty, Type::Null]) } else { SchemaType::Type(ty) };
    OpenApiSchema::Object(ObjectBuilder::new().schema_type(schema_type).format(format.map(SchemaFormat::KnownFormat)).build())
}

fn member_schema(member: &Member) -> RefOr<OpenApiSchema> {
    match &member.ty {
        MemberType::Scalar { primitive, nullable } => primitive_schema(*primitive, *nullable).into(),
        MemberType::One { target_name, .. } => Ref::from_schema_name(target_name).into(),
        MemberType::Many { target_name, .. } => {
            OpenApiSchema::Array(ArrayBuilder::new().items(Ref::from_schema_name(target_name)).build()).into()
        }
    }
}

fn required(member: &Member) -> bool {
    match (&member.ty, &member.tag) {
        (_, Tag::Wire(WireTag::Primary { .. })) => true,
        (_, Tag::Wire(WireTag::Attribute { omit_empty: true, .. } | WireTag::Relationship { omit_empty: true, .. })) => false,
        (MemberType::Scalar { nullable, .. } | MemberType::One { nullable, .. }, _) => !nullable,
        (MemberType::Many { .. }, _) => false,
    }
}

fn shape_schema(shape: &Shape, wire_type: &str) -> RefOr<OpenApiSchema> {
    let mut object = ObjectBuilder::new().title(Some(shape.name.clone())).description(Some(format!("JSON:API `{wire_type}` resource")));
    for member in &shape.members {
        object = object.property(&member.name, member_schema(member));
        if required(member) {
            object = object.required(&member.name);
        }
    }
    OpenApiSchema::Object(object.build()).into()
}

/// Component schemas for the Wire and Wire-Join shape of every given schema.
pub fn components(schemas: &[Arc<Schema>]) -> Components {
    let mut builder = ComponentsBuilder::new();
    for schema in schemas {
        for kind in [ShapeKind::Wire, ShapeKind::WireJoin] {
            let shape = schema.shape(kind);
            builder = builder.schema(shape.name.clone(), shape_schema(shape, &schema.wire_type));
        }
    }
    builder.build()
}
