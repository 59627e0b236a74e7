use convert_case::{Case, Casing};

/// Alphanumeric, with `-` or `_` allowed only between alphanumerics.
pub fn is_wire_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
        }
        _ => false,
    }
}

/// `[0-9a-zA-Z$_]+`, the identifier grammar for tables, aliases and columns.
pub fn is_storage_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'$' || b == b'_')
}

pub fn snake(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Initials of the snake-cased table segments, never equal to the table itself.
pub fn default_alias(table: &str) -> String {
    let initials: String = table.split('_').filter_map(|seg| seg.chars().next()).collect();
    if initials.is_empty() || initials == table {
        format!("{table}_")
    } else {
        initials
    }
}

/// Double-quoted identifier with embedded quotes doubled.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_reject_edge_separators() {
        assert!(is_wire_name("created-at"));
        assert!(is_wire_name("a_b2"));
        assert!(is_wire_name("x"));
        assert!(!is_wire_name("-lead"));
        assert!(!is_wire_name("trail_"));
        assert!(!is_wire_name("with space"));
        assert!(!is_wire_name(""));
    }

    #[test]
    fn storage_identifiers_and_aliases() {
        assert!(is_storage_identifier("blog_posts$1"));
        assert!(!is_storage_identifier("blog-posts"));
        assert_eq!(snake("BlogPost"), "blog_post");
        assert_eq!(default_alias("blog_post"), "bp");
        assert_eq!(default_alias("t"), "t_");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
