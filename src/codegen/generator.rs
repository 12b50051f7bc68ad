// Token generation for a single proto file
//
// Emits prost-compatible Rust items: one struct per message, one enum per proto
// enum, nested types and oneofs in a snake_case module named after their parent.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow, bail};
use proc_macro2::{Literal, TokenStream};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use quote::{format_ident, quote};

use super::ExternPaths;
use super::comments::extract_comments;
use super::names::{
    check_identifier, enum_variant_name, field_ident, module_ident, module_name, to_pascal_case, type_ident,
    type_name,
};

#[derive(PartialEq)]
enum TypeKind {
    Message,
    Enum,
}

struct TypeEntry {
    file: String,
    package: String,
    /// Type names from the package down, e.g. `["Granule", "Footprint"]`.
    path: Vec<String>,
    kind: TypeKind,
    /// Key and value fields when the type is a synthesized map entry.
    map_entry: Option<(FieldDescriptorProto, FieldDescriptorProto)>,
}

/// Every message and enum of a request, by fully qualified name (`.pkg.Type`).
pub struct TypeIndex {
    types: HashMap<String, TypeEntry>,
}

impl TypeIndex {
    pub fn new(files: &[FileDescriptorProto]) -> Self {
        let mut index = TypeIndex { types: HashMap::new() };
        for file in files {
            for message in &file.message_type {
                index.add_message(file, &[], message);
            }
            for e in &file.enum_type {
                index.add_enum(file, &[], e);
            }
        }
        index
    }

    fn full_name(package: &str, path: &[String]) -> String {
        let mut name = String::new();
        for part in package.split('.').filter(|p| !p.is_empty()).chain(path.iter().map(String::as_str)) {
            name.push('.');
            name.push_str(part);
        }
        name
    }

    fn add_message(&mut self, file: &FileDescriptorProto, parent: &[String], message: &DescriptorProto) {
        let mut path = parent.to_vec();
        path.push(message.name().to_string());

        let is_map_entry = message.options.as_ref().is_some_and(|o| o.map_entry());
        let map_entry = if is_map_entry {
            let by_number = |n: i32| message.field.iter().find(|f| f.number() == n).cloned();
            by_number(1).zip(by_number(2))
        } else {
            None
        };

        for nested in &message.nested_type {
            self.add_message(file, &path, nested);
        }
        for e in &message.enum_type {
            self.add_enum(file, &path, e);
        }
        self.types.insert(
            Self::full_name(file.package(), &path),
            TypeEntry {
                file: file.name().to_string(),
                package: file.package().to_string(),
                path,
                kind: TypeKind::Message,
                map_entry,
            },
        );
    }

    fn add_enum(&mut self, file: &FileDescriptorProto, parent: &[String], e: &EnumDescriptorProto) {
        let mut path = parent.to_vec();
        path.push(e.name().to_string());
        self.types.insert(
            Self::full_name(file.package(), &path),
            TypeEntry {
                file: file.name().to_string(),
                package: file.package().to_string(),
                path,
                kind: TypeKind::Enum,
                map_entry: None,
            },
        );
    }

    fn get(&self, type_name: &str) -> Result<&TypeEntry> {
        self.types
            .get(type_name)
            .ok_or_else(|| anyhow!("unknown type {type_name}"))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Syntax {
    Proto2,
    Proto3,
    Editions,
}

struct Generator<'a> {
    file: &'a FileDescriptorProto,
    types: &'a TypeIndex,
    extern_paths: &'a ExternPaths,
    comments: HashMap<String, String>,
    syntax: Syntax,
}

/// Generate the items of `file`. References to types outside the file's
/// package go through `extern_paths`.
pub fn generate_file(
    file: &FileDescriptorProto,
    types: &TypeIndex,
    extern_paths: &ExternPaths,
) -> Result<TokenStream> {
    let syntax = match file.syntax() {
        "" | "proto2" => Syntax::Proto2,
        "proto3" => Syntax::Proto3,
        "editions" => Syntax::Editions,
        other => bail!("unsupported syntax {other:?} in {}", file.name()),
    };
    let generator = Generator {
        file,
        types,
        extern_paths,
        comments: extract_comments(file),
        syntax,
    };

    let mut items = Vec::new();
    for message in &file.message_type {
        items.push(generator.message(message, message.name(), 0)?);
    }
    for e in &file.enum_type {
        items.push(generator.enumeration(e, e.name())?);
    }
    Ok(quote! { #(#items)* })
}

/// Prost kind name and Rust type of a scalar field type.
fn scalar(r#type: Type) -> Option<(&'static str, TokenStream)> {
    let scalar = match r#type {
        Type::Double => ("double", quote! { f64 }),
        Type::Float => ("float", quote! { f32 }),
        Type::Int64 => ("int64", quote! { i64 }),
        Type::Uint64 => ("uint64", quote! { u64 }),
        Type::Int32 => ("int32", quote! { i32 }),
        Type::Fixed64 => ("fixed64", quote! { u64 }),
        Type::Fixed32 => ("fixed32", quote! { u32 }),
        Type::Bool => ("bool", quote! { bool }),
        Type::String => ("string", quote! { ::prost::alloc::string::String }),
        Type::Bytes => ("bytes", quote! { ::prost::alloc::vec::Vec<u8> }),
        Type::Uint32 => ("uint32", quote! { u32 }),
        Type::Sfixed32 => ("sfixed32", quote! { i32 }),
        Type::Sfixed64 => ("sfixed64", quote! { i64 }),
        Type::Sint32 => ("sint32", quote! { i32 }),
        Type::Sint64 => ("sint64", quote! { i64 }),
        Type::Group | Type::Message | Type::Enum => return None,
    };
    Some(scalar)
}

fn scalar_kind(name: &str) -> TokenStream {
    if name == "bytes" {
        quote! { bytes = "vec" }
    } else {
        let kind = format_ident!("{}", name);
        quote! { #kind }
    }
}

fn parse_path(path: &str) -> Result<TokenStream> {
    let ty: syn::Type = syn::parse_str(path).map_err(|e| anyhow!("invalid Rust path {path:?}: {e}"))?;
    Ok(quote! { #ty })
}

impl Generator<'_> {
    fn docs(&self, name_path: &str) -> TokenStream {
        let Some(comment) = self.comments.get(name_path) else {
            return quote! {};
        };
        let lines = comment.lines().map(|line| format!(" {line}"));
        quote! { #(#[doc = #lines])* }
    }

    /// Rust path of `type_name` as seen from an item nested `depth` modules deep.
    fn rust_path(&self, type_name: &str, depth: usize) -> Result<String> {
        let entry = self.types.get(type_name)?;
        if entry.file != self.file.name() {
            return self.extern_paths.resolve(type_name).ok_or_else(|| {
                anyhow!(
                    "no Rust path for {type_name} (package {}); map it with an extern path",
                    entry.package
                )
            });
        }

        let Some((last, modules)) = entry.path.split_last() else {
            bail!("empty type path for {type_name}");
        };
        let mut parts = vec!["super".to_string(); depth];
        parts.extend(modules.iter().map(|m| module_name(m)));
        parts.push(super::names::type_name(last));
        Ok(parts.join("::"))
    }

    fn expect_kind(&self, field: &FieldDescriptorProto, kind: TypeKind) -> Result<()> {
        let entry = self.types.get(field.type_name())?;
        if entry.kind != kind {
            bail!(
                "field {} declares {:?} but {} is not one",
                field.name(),
                field.r#type(),
                field.type_name()
            );
        }
        Ok(())
    }

    /// Prost kind and element type for a non-map field.
    fn field_kind(&self, field: &FieldDescriptorProto, depth: usize) -> Result<(TokenStream, TokenStream)> {
        match field.r#type() {
            Type::Message => {
                self.expect_kind(field, TypeKind::Message)?;
                let path = self.rust_path(field.type_name(), depth)?;
                Ok((quote! { message }, parse_path(&path)?))
            }
            Type::Enum => {
                self.expect_kind(field, TypeKind::Enum)?;
                let path = Literal::string(&self.rust_path(field.type_name(), depth)?);
                Ok((quote! { enumeration = #path }, quote! { i32 }))
            }
            Type::Group => bail!("group field {} is not supported", field.name()),
            other => {
                let (name, ty) = scalar(other).ok_or_else(|| anyhow!("unexpected field type {other:?}"))?;
                Ok((scalar_kind(name), ty))
            }
        }
    }

    fn map_entry(&self, field: &FieldDescriptorProto) -> Option<&(FieldDescriptorProto, FieldDescriptorProto)> {
        if field.label() != Label::Repeated || field.r#type() != Type::Message {
            return None;
        }
        self.types.get(field.type_name()).ok()?.map_entry.as_ref()
    }

    fn map_field(
        &self,
        field: &FieldDescriptorProto,
        (key, value): &(FieldDescriptorProto, FieldDescriptorProto),
        depth: usize,
    ) -> Result<(TokenStream, TokenStream)> {
        let (key_kind, key_ty) = match key.r#type() {
            Type::Float | Type::Double | Type::Bytes | Type::Message | Type::Enum | Type::Group => {
                bail!("invalid key type for map field {}", field.name())
            }
            other => scalar(other).ok_or_else(|| anyhow!("invalid map key {other:?}"))?,
        };
        let (value_kind, value_ty) = match value.r#type() {
            Type::Message => ("message".to_string(), parse_path(&self.rust_path(value.type_name(), depth)?)?),
            Type::Enum => (
                format!("enumeration({})", self.rust_path(value.type_name(), depth)?),
                quote! { i32 },
            ),
            Type::Group => bail!("group value in map field {} is not supported", field.name()),
            other => {
                let (name, ty) = scalar(other).ok_or_else(|| anyhow!("invalid map value {other:?}"))?;
                (name.to_string(), ty)
            }
        };
        let map = Literal::string(&format!("{key_kind}, {value_kind}"));
        Ok((
            quote! { map = #map },
            quote! { ::std::collections::HashMap<#key_ty, #value_ty> },
        ))
    }

    fn has_presence(&self, field: &FieldDescriptorProto) -> bool {
        field.r#type() == Type::Message || field.proto3_optional() || self.syntax != Syntax::Proto3
    }

    fn field(&self, name_path: &str, field: &FieldDescriptorProto, depth: usize) -> Result<TokenStream> {
        check_identifier(field.name(), "field")?;
        let ident = field_ident(field.name())?;
        let docs = self.docs(&format!("{name_path}.{}", field.name()));
        let tag = Literal::string(&field.number().to_string());

        if let Some(entry) = self.map_entry(field) {
            let (kind, ty) = self.map_field(field, entry, depth)?;
            return Ok(quote! {
                #docs
                #[prost(#kind, tag = #tag)]
                pub #ident: #ty,
            });
        }

        let (kind, elem) = self.field_kind(field, depth)?;
        let mut args = vec![kind];
        let ty = match field.label() {
            Label::Repeated => {
                args.push(quote! { repeated });
                let packable = !matches!(field.r#type(), Type::String | Type::Bytes | Type::Message);
                let packed = field.options.as_ref().and_then(|o| o.packed);
                if packable && self.syntax == Syntax::Proto2 && packed != Some(true) {
                    args.push(quote! { packed = "false" });
                }
                quote! { ::prost::alloc::vec::Vec<#elem> }
            }
            Label::Required => {
                args.push(quote! { required });
                elem
            }
            Label::Optional if self.has_presence(field) => {
                args.push(quote! { optional });
                quote! { ::core::option::Option<#elem> }
            }
            Label::Optional => elem,
        };
        args.push(quote! { tag = #tag });

        Ok(quote! {
            #docs
            #[prost(#(#args),*)]
            pub #ident: #ty,
        })
    }

    /// Struct field and enum for one oneof of `message`.
    fn oneof(
        &self,
        message: &DescriptorProto,
        name_path: &str,
        oneof_name: &str,
        members: &[&FieldDescriptorProto],
        depth: usize,
    ) -> Result<(TokenStream, TokenStream)> {
        check_identifier(oneof_name, "oneof")?;
        let field = field_ident(oneof_name)?;
        let enum_ident = type_ident(oneof_name)?;
        let module = module_ident(message.name())?;
        let oneof_path = Literal::string(&format!("{}::{}", module_name(message.name()), type_name(oneof_name)));
        let tags = Literal::string(
            &members.iter().map(|f| f.number().to_string()).collect::<Vec<_>>().join(", "),
        );
        let docs = self.docs(&format!("{name_path}.{oneof_name}"));

        let mut variants = Vec::new();
        for member in members {
            check_identifier(member.name(), "field")?;
            let variant = type_ident(member.name())?;
            let (kind, ty) = self.field_kind(member, depth + 1)?;
            let tag = Literal::string(&member.number().to_string());
            let variant_docs = self.docs(&format!("{name_path}.{}", member.name()));
            variants.push(quote! {
                #variant_docs
                #[prost(#kind, tag = #tag)]
                #variant(#ty),
            });
        }

        let struct_field = quote! {
            #docs
            #[prost(oneof = #oneof_path, tags = #tags)]
            pub #field: ::core::option::Option<#module::#enum_ident>,
        };
        let oneof_enum = quote! {
            #docs
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum #enum_ident {
                #(#variants)*
            }
        };
        Ok((struct_field, oneof_enum))
    }

    fn message(&self, message: &DescriptorProto, name_path: &str, depth: usize) -> Result<TokenStream> {
        check_identifier(message.name(), "message")?;
        if to_pascal_case(message.name()) == "Self" {
            bail!("message name {:?} is reserved in Rust", message.name());
        }
        let ident = type_ident(message.name())?;
        let docs = self.docs(name_path);

        let in_real_oneof = |f: &FieldDescriptorProto| f.oneof_index.is_some() && !f.proto3_optional();

        let mut fields = Vec::new();
        for field in message.field.iter().filter(|f| !in_real_oneof(f)) {
            fields.push(self.field(name_path, field, depth)?);
        }

        let mut nested = Vec::new();
        for (index, oneof) in message.oneof_decl.iter().enumerate() {
            let members: Vec<_> = message
                .field
                .iter()
                .filter(|f| in_real_oneof(f) && f.oneof_index() as usize == index)
                .collect();
            // Synthetic oneofs of proto3 optional fields have no real members.
            if members.is_empty() {
                continue;
            }
            let (field, oneof_enum) = self.oneof(message, name_path, oneof.name(), &members, depth)?;
            fields.push(field);
            nested.push(oneof_enum);
        }

        for child in &message.nested_type {
            if child.options.as_ref().is_some_and(|o| o.map_entry()) {
                continue;
            }
            nested.push(self.message(child, &format!("{name_path}.{}", child.name()), depth + 1)?);
        }
        for e in &message.enum_type {
            nested.push(self.enumeration(e, &format!("{name_path}.{}", e.name()))?);
        }

        let nested_module = if nested.is_empty() {
            quote! {}
        } else {
            let module = module_ident(message.name())?;
            let module_docs = format!(" Nested message and enum types in `{}`.", message.name());
            quote! {
                #[doc = #module_docs]
                pub mod #module {
                    #(#nested)*
                }
            }
        };

        Ok(quote! {
            #docs
            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct #ident {
                #(#fields)*
            }
            #nested_module
        })
    }

    fn enumeration(&self, e: &EnumDescriptorProto, name_path: &str) -> Result<TokenStream> {
        check_identifier(e.name(), "enum")?;
        let ident = type_ident(e.name())?;
        let docs = self.docs(name_path);

        let mut seen = HashSet::new();
        let mut variants = Vec::new();
        let mut to_str = Vec::new();
        let mut from_str = Vec::new();
        // Aliases share a number; the first name wins.
        for value in e.value.iter().filter(|v| seen.insert(v.number())) {
            check_identifier(value.name(), "enum value")?;
            let variant = super::names::ident(&enum_variant_name(e.name(), value.name()))
                .map_err(|err| anyhow!("value {:?} of enum {}: {err}", value.name(), e.name()))?;
            let number = Literal::i32_unsuffixed(value.number());
            let value_name = value.name();
            let value_docs = self.docs(&format!("{name_path}.{value_name}"));
            variants.push(quote! {
                #value_docs
                #variant = #number,
            });
            to_str.push(quote! { Self::#variant => #value_name, });
            from_str.push(quote! { #value_name => ::core::option::Option::Some(Self::#variant), });
        }
        if variants.is_empty() {
            bail!("enum {} has no values", e.name());
        }

        Ok(quote! {
            #docs
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
            #[repr(i32)]
            pub enum #ident {
                #(#variants)*
            }
            impl #ident {
                /// String value of the enum field names used in the ProtoBuf definition.
                pub fn as_str_name(&self) -> &'static str {
                    match self {
                        #(#to_str)*
                    }
                }
                /// Creates an enum from field names used in the ProtoBuf definition.
                pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
                    match value {
                        #(#from_str)*
                        _ => ::core::option::Option::None,
                    }
                }
            }
        })
    }
}
