use std::collections::HashSet;

use crate::contract::{ExportPage, ExportRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportLookup {
    Found {
        record: ExportRecord,
        pages_read: usize,
    },
    Missing {
        exports_scanned: usize,
        truncated: bool,
    },
}

/// Export names are unique per account and region; the first match wins.
pub fn find_export<'a>(
    exports: &'a [ExportRecord],
    export_name: &str,
) -> Option<&'a ExportRecord> {
    exports.iter().find(|record| record.name == export_name)
}

/// Walks the export registry page by page until `export_name` is found.
///
/// With `follow_pages` disabled only the first page is read; a miss on a page
/// that still carries a continuation token is reported as `truncated` so the
/// caller never mistakes a partial listing for a complete one.
pub fn lookup_export<F>(
    export_name: &str,
    follow_pages: bool,
    mut fetch_page: F,
) -> Result<ExportLookup, String>
where
    F: FnMut(Option<&str>) -> Result<ExportPage, String>,
{
    let mut next_token: Option<String> = None;
    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut exports_scanned = 0;
    let mut pages_read = 0;

    loop {
        let page = fetch_page(next_token.as_deref())?;
        pages_read += 1;

        if let Some(record) = find_export(&page.exports, export_name) {
            return Ok(ExportLookup::Found {
                record: record.clone(),
                pages_read,
            });
        }
        exports_scanned += page.exports.len();

        let Some(token) = page.next_token.filter(|token| !token.is_empty()) else {
            return Ok(ExportLookup::Missing {
                exports_scanned,
                truncated: false,
            });
        };

        if !follow_pages {
            return Ok(ExportLookup::Missing {
                exports_scanned,
                truncated: true,
            });
        }

        if !seen_tokens.insert(token.clone()) {
            return Err(format!(
                "export registry returned repeated continuation token after {pages_read} pages"
            ));
        }
        next_token = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, value: &str) -> ExportRecord {
        ExportRecord {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn page(exports: Vec<ExportRecord>, next_token: Option<&str>) -> ExportPage {
        ExportPage {
            exports,
            next_token: next_token.map(str::to_string),
        }
    }

    #[test]
    fn selects_matching_export_and_ignores_others() {
        let exports = vec![
            record("other-export", "E9999"),
            record("my-export", "E1234"),
        ];

        let found = find_export(&exports, "my-export").expect("export should match");

        assert_eq!(found.value, "E1234");
    }

    #[test]
    fn match_is_exact() {
        let exports = vec![record("my-export-staging", "E1"), record("My-Export", "E2")];

        assert!(find_export(&exports, "my-export").is_none());
    }

    #[test]
    fn follows_continuation_tokens_until_found() {
        let mut requested_tokens = Vec::new();
        let lookup = lookup_export("my-export", true, |token| {
            requested_tokens.push(token.map(str::to_string));
            match token {
                None => Ok(page(vec![record("a", "E1"), record("b", "E2")], Some("t1"))),
                Some("t1") => Ok(page(vec![record("my-export", "E1234")], Some("t2"))),
                Some(other) => Err(format!("unexpected token {other}")),
            }
        })
        .expect("lookup should succeed");

        assert_eq!(
            lookup,
            ExportLookup::Found {
                record: record("my-export", "E1234"),
                pages_read: 2,
            }
        );
        assert_eq!(requested_tokens, vec![None, Some("t1".to_string())]);
    }

    #[test]
    fn first_page_only_reports_truncated_listing() {
        let mut calls = 0;
        let lookup = lookup_export("my-export", false, |_| {
            calls += 1;
            Ok(page(vec![record("a", "E1")], Some("t1")))
        })
        .expect("lookup should succeed");

        assert_eq!(calls, 1);
        assert_eq!(
            lookup,
            ExportLookup::Missing {
                exports_scanned: 1,
                truncated: true,
            }
        );
    }

    #[test]
    fn exhausted_listing_is_not_truncated() {
        let lookup = lookup_export("my-export", true, |token| match token {
            None => Ok(page(vec![record("a", "E1")], Some("t1"))),
            _ => Ok(page(vec![record("b", "E2")], None)),
        })
        .expect("lookup should succeed");

        assert_eq!(
            lookup,
            ExportLookup::Missing {
                exports_scanned: 2,
                truncated: false,
            }
        );
    }

    #[test]
    fn empty_token_ends_listing() {
        let lookup = lookup_export("my-export", true, |_| Ok(page(Vec::new(), Some(""))))
            .expect("lookup should succeed");

        assert_eq!(
            lookup,
            ExportLookup::Missing {
                exports_scanned: 0,
                truncated: false,
            }
        );
    }

    #[test]
    fn repeated_token_is_an_error() {
        let error = lookup_export("my-export", true, |_| Ok(page(Vec::new(), Some("loop"))))
            .expect_err("repeated token should fail");

        assert!(error.contains("repeated continuation token"));
    }

    #[test]
    fn token_cycle_is_an_error() {
        let mut calls = 0;
        let error = lookup_export("my-export", true, |token| {
            calls += 1;
            let next = match token {
                None | Some("t2") => "t1",
                _ => "t2",
            };
            Ok(page(vec![record("a", "E1")], Some(next)))
        })
        .expect_err("token cycle should fail");

        assert!(error.contains("repeated continuation token after 3 pages"));
        assert_eq!(calls, 3);
    }

    #[test]
    fn fetch_errors_propagate() {
        let error = lookup_export("my-export", true, |_| Err("access denied".to_string()))
            .expect_err("fetch error should propagate");

        assert_eq!(error, "access denied");
    }
}
