use crate::querier::error::QuerierError;
use crate::querier::types::{QueryRequest, RawFilter, RawPage, RawSort};

/// Decode percent-decoded `key=value` pairs into a [`QueryRequest`].
///
/// Keys use bracket paths: `filter[<field>]=v` (implicit `=` comparison),
/// `filter[<field>][<op>]=v`, `sort[<field>]=direction`, `page[<attr>]=v`.
/// Keys outside the three groups are ignored so unrelated parameters can ride
/// along; a key that names a group but does not fit its shape is an error.
pub fn parse_pairs(pairs: &[(String, String)]) -> Result<QueryRequest, QuerierError> {
    let mut request = QueryRequest::default();

    for (key, value) in pairs {
        let (group, segments) = match split_key(key) {
            Some(parts) => parts,
            None => return Err(malformed(key)),
        };

        match group {
            "filter" => match segments.as_slice() {
                [field] if !field.is_empty() => request.filters.push(RawFilter {
                    field: (*field).to_string(),
                    op: None,
                    value: value.clone(),
                }),
                [field, op] if !field.is_empty() && !op.is_empty() => {
                    request.filters.push(RawFilter {
                        field: (*field).to_string(),
                        op: Some((*op).to_string()),
                        value: value.clone(),
                    })
                }
                _ => return Err(malformed(key)),
            },
            "sort" => match segments.as_slice() {
                [field] if !field.is_empty() => request.sorts.push(RawSort {
                    field: (*field).to_string(),
                    direction: value.clone(),
                }),
                _ => return Err(malformed(key)),
            },
            "page" => match segments.as_slice() {
                [attr] if !attr.is_empty() => request.page.push(RawPage {
                    attr: (*attr).to_string(),
                    value: value.clone(),
                }),
                _ => return Err(malformed(key)),
            },
            _ => {}
        }
    }

    Ok(request)
}

/// Split `group[seg1][seg2]` into the group prefix and its bracket segments.
/// Returns `None` when the bracket structure is broken (unbalanced, nested,
/// or text outside the brackets).
fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let open = match key.find('[') {
        Some(index) => index,
        None => return Some((key, Vec::new())),
    };

    let group = &key[..open];
    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return None;
        }
        let close = rest.find(']')?;
        let segment = &rest[1..close];
        if segment.contains('[') {
            return None;
        }
        segments.push(segment);
        rest = &rest[close + 1..];
    }

    Some((group, segments))
}

fn malformed(key: &str) -> QuerierError {
    QuerierError::invalid(format!("malformed query parameter '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_filters_sorts_and_page() {
        let request = parse_pairs(&pairs(&[
            ("filter[visible][=]", "1"),
            ("filter[room_id]", "5"),
            ("sort[created_at]", "desc"),
            ("page[number]", "2"),
            ("page[size]", "25"),
        ]))
        .unwrap();

        assert_eq!(request.filters.len(), 2);
        assert_eq!(request.filters[0].field, "visible");
        assert_eq!(request.filters[0].op.as_deref(), Some("="));
        assert_eq!(request.filters[0].value, "1");
        // no operator segment means implicit equality, resolved later
        assert_eq!(request.filters[1].op, None);

        assert_eq!(request.sorts.len(), 1);
        assert_eq!(request.sorts[0].field, "created_at");
        assert_eq!(request.sorts[0].direction, "desc");

        assert_eq!(request.page.len(), 2);
        assert_eq!(request.page[0].attr, "number");
        assert_eq!(request.page[1].value, "25");
    }

    #[test]
    fn filter_order_follows_the_request() {
        let request = parse_pairs(&pairs(&[
            ("filter[room_id][=]", "5"),
            ("filter[visible][=]", "1"),
        ]))
        .unwrap();
        assert_eq!(request.filters[0].field, "room_id");
        assert_eq!(request.filters[1].field, "visible");
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let request = parse_pairs(&pairs(&[
            ("token", "abc"),
            ("include[author]", "true"),
            ("", "x"),
        ]))
        .unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn malformed_group_keys_are_rejected() {
        for key in [
            "filter",
            "filter[]",
            "filter[visible][=][extra]",
            "filter[visible][]",
            "filter[visible]extra",
            "filter[visible",
            "filter[[visible]]",
            "sort",
            "sort[created_at][desc]",
            "page",
            "page[]",
        ] {
            let err = parse_pairs(&pairs(&[(key, "1")])).unwrap_err();
            assert!(
                err.to_string().contains("malformed query parameter"),
                "expected malformed error for '{key}', got: {err}"
            );
        }
    }

    #[test]
    fn empty_query_string_parses_to_empty_request() {
        let request = parse_pairs(&[]).unwrap();
        assert!(request.is_empty());
    }
}
