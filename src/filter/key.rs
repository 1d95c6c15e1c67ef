//! Filter key parsing
//!
//! Separates the syntax of a raw filter key from what it means. The group
//! marker is matched on the whole key first; anything else is split on the
//! last delimiter occurrence, so field names may themselves contain it.

/// Parsed form of a raw filter-map key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey<'a> {
    /// `name` (equality)
    Field(&'a str),
    /// `name__op`
    FieldOp { field: &'a str, operator: &'a str },
    /// The OR-group marker
    OrGroup,
}

impl<'a> FilterKey<'a> {
    /// Parse a key using the given delimiter and group marker
    pub fn parse(key: &'a str, delimiter: &str, or_group_marker: &str) -> Self {
        if key == or_group_marker {
            return FilterKey::OrGroup;
        }
        match key.rsplit_once(delimiter) {
            Some((field, operator)) => FilterKey::FieldOp { field, operator },
            None => FilterKey::Field(key),
        }
    }

    /// Field name, if any
    pub fn field(&self) -> Option<&'a str> {
        match self {
            FilterKey::Field(field) | FilterKey::FieldOp { field, .. } => Some(field),
            FilterKey::OrGroup => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(key: &str) -> FilterKey<'_> {
        FilterKey::parse(key, "__", "__or__")
    }

    #[test]
    fn test_bare_field() {
        assert_eq!(parse("name"), FilterKey::Field("name"));
    }

    #[test]
    fn test_field_with_operator() {
        assert_eq!(
            parse("age__gt"),
            FilterKey::FieldOp {
                field: "age",
                operator: "gt"
            }
        );
    }

    #[test]
    fn test_splits_on_last_delimiter() {
        assert_eq!(
            parse("is_deleted__is_not"),
            FilterKey::FieldOp {
                field: "is_deleted",
                operator: "is_not"
            }
        );
        assert_eq!(
            parse("a__b__in"),
            FilterKey::FieldOp {
                field: "a__b",
                operator: "in"
            }
        );
    }

    #[test]
    fn test_group_marker_is_whole_key() {
        assert_eq!(parse("__or__"), FilterKey::OrGroup);
        assert_eq!(parse("__or__").field(), None);
        assert_eq!(parse("name__or").field(), Some("name"));
    }

    #[test]
    fn test_custom_syntax() {
        let key = FilterKey::parse("price.lt", ".", "$or");
        assert_eq!(
            key,
            FilterKey::FieldOp {
                field: "price",
                operator: "lt"
            }
        );
        assert_eq!(FilterKey::parse("$or", ".", "$or"), FilterKey::OrGroup);
    }
}
