use crate::macro_utils;
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::token::Comma;
use syn::{Fields, ItemStruct, LitStr, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Id,
    Attr,
    BelongsTo,
    Has,
    Many2Many,
    Expires,
    Created,
    Updated,
}

impl Role {
    fn from_ident(ident: &str) -> Option<Role> {
        match ident {
            "id" => Some(Role::Id),
            "attr" => Some(Role::Attr),
            "belongs_to" => Some(Role::BelongsTo),
            "has" => Some(Role::Has),
            "many2many" => Some(Role::Many2Many),
            "expires" => Some(Role::Expires),
            "created" => Some(Role::Created),
            "updated" => Some(Role::Updated),
            _ => None,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Role::BelongsTo | Role::Has | Role::Many2Many)
    }

    pub fn tokens(&self) -> TokenStream {
        match self {
            Role::Id => quote!(::resmap::resource::Role::Id),
            Role::Attr => quote!(::resmap::resource::Role::Attr),
            Role::BelongsTo => quote!(::resmap::resource::Role::BelongsTo),
            Role::Has => quote!(::resmap::resource::Role::Has),
            Role::Many2Many => quote!(::resmap::resource::Role::Many2Many),
            Role::Expires => quote!(::resmap::resource::Role::Expires),
            Role::Created => quote!(::resmap::resource::Role::Created),
            Role::Updated => quote!(::resmap::resource::Role::Updated),
        }
    }
}

/// Member type as far as it can be told from syntax alone.
#[derive(Clone)]
pub enum FieldType {
    /// Variant name of `resmap::value::Primitive`.
    Primitive { primitive: &'static str, optional: bool },
    One { target: Type, optional: bool },
    Many { target: Type },
    Other(String),
}

#[derive(Clone)]
pub struct FieldDef {
    pub name: Ident,
    pub tpe: Type,
}

pub struct MemberDef {
    pub field: FieldDef,
    pub role: Role,
    pub annotation: String,
    pub kind: FieldType,
}

#[derive(Default)]
pub struct StructAttrs {
    pub name: Option<String>,
    pub table: Option<String>,
    pub alias: Option<String>,
}

pub fn get_named_fields(ast: &ItemStruct) -> Result<Punctuated<syn::Field, Comma>, syn::Error> {
    match &ast.fields {
        Fields::Named(named) => Ok(named.named.clone()),
        _ => Err(syn::Error::new(ast.span(), "`#[derive(Resource)]` only supports structs with named fields.")),
    }
}

pub fn parse_struct_attrs(ast: &ItemStruct) -> Result<StructAttrs, syn::Error> {
    let mut attrs = StructAttrs::default();
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("resource")) {
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("name") {
                &mut attrs.name
            } else if meta.path.is_ident("table") {
                &mut attrs.table
            } else if meta.path.is_ident("alias") {
                &mut attrs.alias
            } else {
                return Err(meta.error("expected `name`, `table` or `alias`"));
            };
            let value: LitStr = meta.value()?.parse()?;
            *slot = Some(value.value());
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn primitive_of(ty: &Type) -> Option<&'static str> {
    if macro_utils::is_datetime_utc(ty) {
        return Some("Time");
    }
    let Type::Path(tp) = ty else { return None };
    let ident = tp.path.segments.last()?.ident.to_string();
    let primitive = match ident.as_str() {
        "bool" => "Bool",
        "i8" => "I8",
        "i16" => "I16",
        "i32" => "I32",
        "i64" => "I64",
        "u8" => "U8",
        "u16" => "U16",
        "u32" => "U32",
        "u64" => "U64",
        "f32" => "F32",
        "f64" => "F64",
        "String" => "String",
        _ => return None,
    };
    Some(primitive)
}

fn classify(role: Role, ty: &Type) -> FieldType {
    let other = || FieldType::Other(macro_utils::type_name(ty));
    if role.is_relation() {
        if let Some(inner) = macro_utils::generic_inner(ty, "Box") {
            return FieldType::One { target: inner.clone(), optional: false };
        }
        if let Some(inner) = macro_utils::generic_inner(ty, "Option").and_then(|t| macro_utils::generic_inner(t, "Box")) {
            return FieldType::One { target: inner.clone(), optional: true };
        }
        if let Some(inner) = macro_utils::generic_inner(ty, "Vec") {
            return FieldType::Many { target: inner.clone() };
        }
        return other();
    }
    match macro_utils::generic_inner(ty, "Option") {
        Some(inner) => primitive_of(inner).map(|primitive| FieldType::Primitive { primitive, optional: true }),
        None => primitive_of(ty).map(|primitive| FieldType::Primitive { primitive, optional: false }),
    }
    .unwrap_or_else(other)
}

/// `#[resource(role)]` or `#[resource(role = "annotation")]`, exactly one per field.
pub fn parse_member(field: &syn::Field) -> Result<MemberDef, syn::Error> {
    let name = field.ident.clone().ok_or_else(|| syn::Error::new(field.span(), "Unnamed fields not supported"))?;
    let mut found: Option<(Role, String)> = None;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("resource")) {
        attr.parse_nested_meta(|meta| {
            let ident = meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default();
            let role = Role::from_ident(&ident).ok_or_else(|| {
                meta.error("expected one of `id`, `attr`, `belongs_to`, `has`, `many2many`, `expires`, `created`, `updated`")
            })?;
            if found.is_some() {
                return Err(meta.error("a field takes exactly one role"));
            }
            let annotation = if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<LitStr>()?.value()
            } else {
                String::new()
            };
            found = Some((role, annotation));
            Ok(())
        })?;
    }
    let (role, annotation) = found.ok_or_else(|| {
        syn::Error::new(field.span(), format!("field `{name}` needs a role, e.g. `#[resource(attr)]`"))
    })?;
    let kind = classify(role, &field.ty);
    Ok(MemberDef { field: FieldDef { name, tpe: field.ty.clone() }, role, annotation, kind })
}
