// Identifier conversion for generated Rust code

use proc_macro2::Ident;
use quote::format_ident;

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "gen",
];

/// Keywords that cannot be raw identifiers.
const NON_RAW_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

/// Reject names that cannot become Rust identifiers.
pub fn check_identifier(name: &str, what: &str) -> anyhow::Result<()> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') || name == "_" {
        anyhow::bail!("{what} name {name:?} is not a valid identifier");
    }
    Ok(())
}

/// Field and variant identifiers: `r#` for keywords, trailing `_` where `r#` is not allowed.
pub fn sanitize_field_name(name: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// Sanitize a module name by appending underscore for keywords
/// (can't use r# prefix for modules, especially with leading underscores)
pub fn sanitize_module_name(name: &str) -> String {
    if RUST_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Split an identifier into words on `_` and on lower-to-upper case changes.
/// Digits stay attached to the word before them.
fn words(name: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum Mode {
        Boundary,
        Lower,
        Upper,
    }

    let mut words = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Boundary;
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            mode = Mode::Boundary;
            continue;
        }

        let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && (mode == Mode::Lower || (mode == Mode::Upper && next_is_lower));
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);

        if c.is_lowercase() {
            mode = Mode::Lower;
        } else if c.is_uppercase() {
            mode = Mode::Upper;
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `sentinel1_sar` / `UUID` / `LatLonAlt` -> `Sentinel1Sar` / `Uuid` / `LatLonAlt`
pub fn to_pascal_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            }
        })
        .collect()
}

/// `LatLonAlt` -> `lat_lon_alt`
pub fn to_snake_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// `ProcessingLevel` -> `PROCESSING_LEVEL`
pub fn to_screaming_snake_case(name: &str) -> String {
    to_snake_case(name).to_uppercase()
}

/// Build an identifier from an already converted name, `r#` prefix allowed.
/// Case conversion can turn a valid proto name into an invalid Rust one
/// (`_2D` -> `2d`), so the result is checked again here.
pub fn ident(name: &str) -> anyhow::Result<Ident> {
    let bare = name.strip_prefix("r#").unwrap_or(name);
    let mut chars = bare.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') || bare == "_" {
        anyhow::bail!("{name:?} is not a valid Rust identifier");
    }
    Ok(format_ident!("{}", name))
}

/// `UUID` -> `Uuid`, `Self` -> `Self_`
pub fn type_name(name: &str) -> String {
    let name = to_pascal_case(name);
    if NON_RAW_KEYWORDS.contains(&name.as_str()) {
        format!("{name}_")
    } else {
        name
    }
}

/// Struct or enum identifier for a proto message or enum name.
pub fn type_ident(name: &str) -> anyhow::Result<Ident> {
    ident(&type_name(name)).map_err(|e| anyhow::anyhow!("type {name:?}: {e}"))
}

pub fn field_ident(name: &str) -> anyhow::Result<Ident> {
    ident(&sanitize_field_name(&to_snake_case(name))).map_err(|e| anyhow::anyhow!("field {name:?}: {e}"))
}

pub fn module_name(message_name: &str) -> String {
    sanitize_module_name(&to_snake_case(message_name))
}

pub fn module_ident(message_name: &str) -> anyhow::Result<Ident> {
    ident(&module_name(message_name)).map_err(|e| anyhow::anyhow!("module for {message_name:?}: {e}"))
}

/// Variant name for an enum value, with the enum's own prefix stripped the
/// way prost does it: `PROCESSING_LEVEL_L1A` in `ProcessingLevel` -> `L1a`.
pub fn enum_variant_name(enum_name: &str, value_name: &str) -> String {
    let prefix = format!("{}_", to_screaming_snake_case(enum_name));
    let stripped = match value_name.strip_prefix(&prefix) {
        Some(rest) if rest.chars().next().is_some_and(|c| c.is_alphabetic()) => rest,
        _ => value_name,
    };
    to_pascal_case(&stripped.to_lowercase())
}
