// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-range grammar for partitioning.
//
// A range string is a comma-separated list of tokens, each either `v` or
// `a-b` (1-based, inclusive). Reversed bounds are swapped, then both bounds
// are clamped to `[1, page_count]`.

use pdfmaster_core::error::{PdfMasterError, Result};

/// An inclusive, 1-based span of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    pub first: usize,
    pub last: usize,
}

impl PageSpan {
    /// Number of pages covered.
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    /// 0-based page indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.first - 1)..self.last
    }
}

/// Parse `spec` against a document of `page_count` pages.
///
/// `None` yields a single span covering the whole document. Every token is
/// checked before anything is returned, so a malformed token rejects the
/// whole request.
pub fn parse_ranges(spec: Option<&str>, page_count: usize) -> Result<Vec<PageSpan>> {
    if page_count == 0 {
        return Err(PdfMasterError::InvalidPageRange {
            range: "document has no pages".into(),
        });
    }

    let Some(spec) = spec.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(vec![PageSpan {
            first: 1,
            last: page_count,
        }]);
    };

    spec.split(',')
        .map(|token| parse_token(token, page_count))
        .collect()
}

fn parse_token(token: &str, page_count: usize) -> Result<PageSpan> {
    let token = token.trim();
    let malformed = || PdfMasterError::InvalidPageRange {
        range: token.to_string(),
    };

    let mut bounds = token.split('-');
    let (a, b) = match (bounds.next(), bounds.next(), bounds.next()) {
        (Some(single), None, None) => {
            let value = parse_bound(single).ok_or_else(malformed)?;
            (value, value)
        }
        (Some(a), Some(b), None) => (
            parse_bound(a).ok_or_else(malformed)?,
            parse_bound(b).ok_or_else(malformed)?,
        ),
        _ => return Err(malformed()),
    };

    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    Ok(PageSpan {
        first: low.clamp(1, page_count),
        last: high.clamp(1, page_count),
    })
}

fn parse_bound(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Anything too large for usize is past the last page anyway.
    Some(raw.parse().unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(spec: &str, pages: usize) -> Vec<(usize, usize)> {
        parse_ranges(Some(spec), pages)
            .unwrap()
            .into_iter()
            .map(|span| (span.first, span.last))
            .collect()
    }

    #[test]
    fn missing_spec_covers_whole_document() {
        let all = parse_ranges(None, 8).unwrap();
        assert_eq!(all, vec![PageSpan { first: 1, last: 8 }]);
        assert_eq!(parse_ranges(Some("  "), 3).unwrap()[0].len(), 3);
    }

    #[test]
    fn simple_range_and_single_pages() {
        assert_eq!(spans("2-5", 8), vec![(2, 5)]);
        assert_eq!(spans("1, 3 ,8", 8), vec![(1, 1), (3, 3), (8, 8)]);
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        assert_eq!(spans("7-3", 8), vec![(3, 7)]);
        assert_eq!(parse_ranges(Some("7-3"), 8).unwrap()[0].len(), 5);
    }

    #[test]
    fn out_of_bounds_are_clamped_after_swapping() {
        assert_eq!(spans("10-2", 8), vec![(2, 8)]);
        assert_eq!(spans("0-3", 8), vec![(1, 3)]);
        assert_eq!(spans("12", 8), vec![(8, 8)]);
        assert_eq!(spans("99999999999999999999999", 4), vec![(4, 4)]);
    }

    #[test]
    fn malformed_tokens_reject_everything() {
        for bad in ["1,,2", "a-3", "1-2-3", "-4", "3-", "1.5", "2,x"] {
            let err = parse_ranges(Some(bad), 8).err().unwrap();
            assert!(
                matches!(err, PdfMasterError::InvalidPageRange { .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn empty_document_cannot_be_partitioned() {
        assert!(parse_ranges(None, 0).is_err());
    }

    #[test]
    fn indices_are_zero_based() {
        let span = PageSpan { first: 2, last: 4 };
        assert_eq!(span.indices().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
