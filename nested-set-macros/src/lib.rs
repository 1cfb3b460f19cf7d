use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Fields, Ident, Type};

#[proc_macro_derive(NestedSetModel, attributes(nested_set))]
pub fn derive_nested_set_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match impl_nested_set_model(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct Options {
    id_field: Option<String>,
    id_type: Option<Type>,
    parent_field: Option<String>,
    left_field: Option<String>,
    right_field: Option<String>,
    order_field: Option<String>,
    entity_name: Option<String>,
    insert_policy: Option<syn::LitStr>,
}

fn impl_nested_set_model(input: &DeriveInput) -> syn::Result<TokenStream> {
    let struct_ident = &input.ident;

    let data_struct = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "NestedSetModel can only be derived for structs",
            ))
        }
    };

    let mut options = Options::default();
    for attr in &input.attrs {
        if attr.path().is_ident("nested_set") {
            parse_nested_set_attr(attr, &mut options)?;
        }
    }

    let id_field_name = options.id_field.unwrap_or_else(|| "id".to_string());
    let parent_field_name = options
        .parent_field
        .unwrap_or_else(|| "parent_id".to_string());
    let left_field_name = options.left_field.unwrap_or_else(|| "lft".to_string());
    let right_field_name = options.right_field.unwrap_or_else(|| "rgt".to_string());
    let order_field_name = options.order_field.unwrap_or_else(|| "name".to_string());

    let id_field_ident = Ident::new(&id_field_name, struct_ident.span());
    let parent_field_ident = Ident::new(&parent_field_name, struct_ident.span());
    let left_field_ident = Ident::new(&left_field_name, struct_ident.span());
    let right_field_ident = Ident::new(&right_field_name, struct_ident.span());
    let order_field_ident = Ident::new(&order_field_name, struct_ident.span());

    let mut id_field_type: Option<Type> = options.id_type.clone();

    if let Fields::Named(ref fields) = data_struct.fields {
        let mut seen = Vec::new();
        for field in &fields.named {
            if let Some(ident) = &field.ident {
                if ident == &id_field_ident && id_field_type.is_none() {
                    id_field_type = Some(field.ty.clone());
                }
                seen.push(ident.unraw().to_string());
            }
        }
        for required in [
            &parent_field_name,
            &left_field_name,
            &right_field_name,
            &order_field_name,
        ] {
            if !seen.iter().any(|name| name == required) {
                return Err(syn::Error::new(
                    struct_ident.span(),
                    format!("NestedSetModel expects a field named `{required}`"),
                ));
            }
        }
    } else {
        return Err(syn::Error::new(
            data_struct.fields.span(),
            "NestedSetModel requires named fields",
        ));
    }

    let id_type = id_field_type.ok_or_else(|| {
        syn::Error::new(
            struct_ident.span(),
            "Unable to determine id field type; specify `id_type = ...` in #[nested_set]",
        )
    })?;

    let policy_variant = match &options.insert_policy {
        None => format_ident!("Alphabetical"),
        Some(literal) => match literal.value().as_str() {
            "first" => format_ident!("First"),
            "last" => format_ident!("Last"),
            "alphabetical" | "alphabetically" => format_ident!("Alphabetical"),
            other => {
                return Err(syn::Error::new(
                    literal.span(),
                    format!(
                        "Invalid insert_policy `{other}`; expected \"first\", \"last\" or \"alphabetical\""
                    ),
                ))
            }
        },
    };

    let entity_name = options
        .entity_name
        .unwrap_or_else(|| struct_ident.unraw().to_string());
    let entity_name_literal = syn::LitStr::new(&entity_name, struct_ident.span());

    let id_column_variant = format_ident!("{}", to_pascal_case(&id_field_name));
    let parent_column_variant = format_ident!("{}", to_pascal_case(&parent_field_name));
    let left_column_variant = format_ident!("{}", to_pascal_case(&left_field_name));
    let right_column_variant = format_ident!("{}", to_pascal_case(&right_field_name));

    let generated = quote! {
        impl ::nested_set::NestedSetModel for #struct_ident {
            type Entity = Entity;
            type ActiveModel = ActiveModel;
            type Id = #id_type;

            fn nested_set_config() -> &'static ::nested_set::NestedSetConfig {
                static CONFIG: ::nested_set::__private::once_cell::sync::Lazy<::nested_set::NestedSetConfig> =
                    ::nested_set::__private::once_cell::sync::Lazy::new(|| {
                        let base = ::nested_set::NestedSetConfig::new(#entity_name_literal);
                        ::nested_set::NestedSetOptions::default()
                            .insert_policy(::nested_set::InsertPolicy::#policy_variant)
                            .apply(base)
                    });
                &CONFIG
            }

            fn id(&self) -> Self::Id {
                self.#id_field_ident.clone()
            }

            fn parent_id(&self) -> Option<Self::Id> {
                self.#parent_field_ident.clone()
            }

            fn interval(&self) -> ::nested_set::Interval {
                ::nested_set::Interval::new(self.#left_field_ident, self.#right_field_ident)
            }

            fn order_key(&self) -> &str {
                self.#order_field_ident.as_str()
            }

            fn id_to_value(id: &Self::Id) -> ::sea_orm::Value {
                ::sea_orm::Value::from(id.clone())
            }

            fn parent_to_value(parent: Option<&Self::Id>) -> ::sea_orm::Value {
                ::sea_orm::Value::from(parent.cloned())
            }

            fn draft_parent_id(active: &Self::ActiveModel) -> Option<Self::Id> {
                match &active.#parent_field_ident {
                    ::sea_orm::ActiveValue::Set(value) | ::sea_orm::ActiveValue::Unchanged(value) => {
                        value.clone()
                    }
                    ::sea_orm::ActiveValue::NotSet => None,
                }
            }

            fn draft_interval(active: &Self::ActiveModel) -> Option<::nested_set::Interval> {
                match (&active.#left_field_ident, &active.#right_field_ident) {
                    (
                        ::sea_orm::ActiveValue::Set(left) | ::sea_orm::ActiveValue::Unchanged(left),
                        ::sea_orm::ActiveValue::Set(right) | ::sea_orm::ActiveValue::Unchanged(right),
                    ) => Some(::nested_set::Interval::new(*left, *right)),
                    _ => None,
                }
            }

            fn draft_order_key(active: &Self::ActiveModel) -> Option<String> {
                match &active.#order_field_ident {
                    ::sea_orm::ActiveValue::Set(value) | ::sea_orm::ActiveValue::Unchanged(value) => {
                        Some(value.clone())
                    }
                    ::sea_orm::ActiveValue::NotSet => None,
                }
            }

            fn set_interval(active: &mut Self::ActiveModel, interval: ::nested_set::Interval) {
                active.#left_field_ident = ::sea_orm::ActiveValue::Set(interval.left);
                active.#right_field_ident = ::sea_orm::ActiveValue::Set(interval.right);
            }

            fn id_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#id_column_variant
            }

            fn parent_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#parent_column_variant
            }

            fn left_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#left_column_variant
            }

            fn right_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#right_column_variant
            }
        }
    };

    Ok(generated.into())
}

fn parse_nested_set_attr(attr: &Attribute, options: &mut Options) -> syn::Result<()> {
    attr.parse_nested_meta(|meta| {
        let ident = meta
            .path
            .get_ident()
            .ok_or_else(|| syn::Error::new(meta.path.span(), "Invalid option key"))?
            .to_string();

        match ident.as_str() {
            "id_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.id_field = Some(value.value());
            }
            "parent_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.parent_field = Some(value.value());
            }
            "left_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.left_field = Some(value.value());
            }
            "right_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.right_field = Some(value.value());
            }
            "order_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.order_field = Some(value.value());
            }
            "entity_name" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.entity_name = Some(value.value());
            }
            "insert_policy" => {
                options.insert_policy = Some(meta.value()?.parse()?);
            }
            "id_type" => {
                let ty: Type = meta.value()?.parse()?;
                options.id_type = Some(ty);
            }
            other => {
                return Err(syn::Error::new(
                    meta.path.span(),
                    format!("Unsupported nested_set option `{other}`"),
                ));
            }
        }

        Ok(())
    })
}

fn to_pascal_case(value: &str) -> String {
    value
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
