use crate::field_parser::{self, FieldType, MemberDef, Role};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::ItemStruct;

fn optional_str(value: &Option<String>) -> TokenStream {
    match value {
        Some(v) => quote!(Some(#v)),
        None => quote!(None),
    }
}

fn type_decl(member: &MemberDef) -> TokenStream {
    match &member.kind {
        FieldType::Primitive { primitive, optional } => {
            let variant = format_ident!("{}", primitive);
            quote! {
                ::resmap::resource::TypeDecl::Primitive { primitive: ::resmap::value::Primitive::#variant, optional: #optional }
            }
        }
        FieldType::One { target, optional } => quote! {
            ::resmap::resource::TypeDecl::Record {
                target: ::resmap::resource::RecordRef::of::<#target>(),
                cardinality: ::resmap::resource::Cardinality::One,
                optional: #optional,
            }
        },
        FieldType::Many { target } => quote! {
            ::resmap::resource::TypeDecl::Record {
                target: ::resmap::resource::RecordRef::of::<#target>(),
                cardinality: ::resmap::resource::Cardinality::Many,
                optional: false,
            }
        },
        FieldType::Other(found) => quote!(::resmap::resource::TypeDecl::Other(#found)),
    }
}

fn member_decl(member: &MemberDef) -> TokenStream {
    let ident = member.field.name.to_string();
    let role = member.role.tokens();
    let annotation = &member.annotation;
    let ty = type_decl(member);
    quote! {
        ::resmap::resource::MemberDecl { ident: #ident, role: #role, annotation: #annotation, ty: #ty }
    }
}

/// Getter and setter moving one field in and out of `DomainValue`; relations carry target ids.
fn accessor(member: &MemberDef) -> Option<TokenStream> {
    if member.role == Role::Many2Many {
        return None;
    }
    let name = &member.field.name;
    let ident = name.to_string();
    let (get, set) = match &member.kind {
        FieldType::Primitive { .. } => (
            quote!(::resmap::resource::DomainValue::Scalar(::resmap::value::ToValue::to_value(&s.#name))),
            quote! {
                ::resmap::resource::DomainValue::Scalar(v) => {
                    s.#name = ::resmap::value::FromValue::from_value(v)?;
                    Ok(())
                }
            },
        ),
        FieldType::One { target, optional: false } => (
            quote!(::resmap::resource::DomainValue::One(Some(<#target as ::resmap::Resource>::id_value(&*s.#name)))),
            quote! {
                ::resmap::resource::DomainValue::One(Some(id)) => {
                    s.#name = Box::new(<#target as ::resmap::Resource>::from_id(id)?);
                    Ok(())
                }
            },
        ),
        FieldType::One { target, optional: true } => (
            quote! {
                ::resmap::resource::DomainValue::One(s.#name.as_ref().map(|t| <#target as ::resmap::Resource>::id_value(&**t)))
            },
            quote! {
                ::resmap::resource::DomainValue::One(id) => {
                    s.#name = match id {
                        Some(id) => Some(Box::new(<#target as ::resmap::Resource>::from_id(id)?)),
                        None => None,
                    };
                    Ok(())
                }
            },
        ),
        FieldType::Many { target } => (
            quote! {
                ::resmap::resource::DomainValue::Many(s.#name.iter().map(<#target as ::resmap::Resource>::id_value).collect())
            },
            quote! {
                ::resmap::resource::DomainValue::Many(ids) => {
                    s.#name = ids
                        .into_iter()
                        .map(<#target as ::resmap::Resource>::from_id)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(())
                }
            },
        ),
        FieldType::Other(_) => return None,
    };
    Some(quote! {
        ::resmap::resource::Accessor {
            ident: #ident,
            get: |s: &Self| -> ::resmap::resource::DomainValue { #get },
            set: |s: &mut Self, value: ::resmap::resource::DomainValue| -> Result<(), ::resmap::value::ValueError> {
                match value {
                    #set
                    other => Err(::resmap::value::ValueError::new(#ident, &format!("{:?}", other))),
                }
            },
        }
    })
}

fn id_impls(struct_ident: &Ident, members: &[MemberDef]) -> TokenStream {
    let type_name = struct_ident.to_string();
    let id = members.iter().find(|m| m.role == Role::Id && matches!(m.kind, FieldType::Primitive { optional: false, .. }));
    match id {
        Some(member) => {
            let name = &member.field.name;
            quote! {
                fn id_value(&self) -> ::resmap::value::Value {
                    ::resmap::value::ToValue::to_value(&self.#name)
                }

                fn set_id(&mut self, id: ::resmap::value::Value) -> Result<(), ::resmap::value::ValueError> {
                    self.#name = ::resmap::value::FromValue::from_value(id)?;
                    Ok(())
                }
            }
        }
        None => quote! {
            fn id_value(&self) -> ::resmap::value::Value {
                ::resmap::value::Value::Null
            }

            fn set_id(&mut self, id: ::resmap::value::Value) -> Result<(), ::resmap::value::ValueError> {
                Err(::resmap::value::ValueError::new(#type_name, &id.describe()))
            }
        },
    }
}

pub fn new(item_struct: &ItemStruct) -> Result<TokenStream, syn::Error> {
    let struct_ident = &item_struct.ident;
    let type_name = struct_ident.to_string();
    let attrs = field_parser::parse_struct_attrs(item_struct)?;
    let members = field_parser::get_named_fields(item_struct)?
        .iter()
        .map(field_parser::parse_member)
        .collect::<Result<Vec<_>, _>>()?;

    let name = optional_str(&attrs.name);
    let table = optional_str(&attrs.table);
    let alias = optional_str(&attrs.alias);
    let member_decls: Vec<TokenStream> = members.iter().map(member_decl).collect();
    let accessors: Vec<TokenStream> = members.iter().filter_map(accessor).collect();
    let id_impls = id_impls(struct_ident, &members);

    Ok(quote! {
        impl ::resmap::Resource for #struct_ident {
            fn declaration() -> ::resmap::resource::Declaration {
                ::resmap::resource::Declaration {
                    type_name: #type_name,
                    name: #name,
                    table: #table,
                    alias: #alias,
                    members: vec![#(#member_decls),*],
                }
            }

            fn accessors() -> Vec<::resmap::resource::Accessor<Self>> {
                vec![#(#accessors),*]
            }

            #id_impls
        }

        ::resmap::inventory::submit! {
            ::resmap::resource::ResourceInfo {
                name: #type_name,
                record: ::resmap::resource::RecordRef::of::<#struct_ident>,
            }
        }
    })
}
