//! Page-number widget: which page links to show for a paginated list.

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

/// Pages shown in full below this count
const SHOW_ALL_MAX: u32 = 5;

/// One entry of the page-number widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(n) => serializer.serialize_u32(*n),
            Self::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

/// Build the page range for page `current` of `max`.
///
/// The first and last pages are always present, along with the neighbours
/// of the current page. A one-page gap is filled in, longer gaps collapse
/// to an ellipsis.
pub fn page_range(current: u32, max: u32) -> Vec<PageItem> {
    let max = max.max(1);
    let current = current.clamp(1, max);

    if max <= SHOW_ALL_MAX {
        return (1..=max).map(PageItem::Page).collect();
    }

    let mut around: BTreeSet<u32> = if current == 1 {
        [1, 2, 3].into()
    } else if current == max {
        [max - 2, max - 1, max].into()
    } else {
        [current - 1, current, current + 1].into()
    };
    around.insert(1);
    around.insert(max);

    let base: Vec<u32> = around.into_iter().filter(|&p| p >= 1 && p <= max).collect();
    let mut range = Vec::with_capacity(base.len() + 2);

    for (i, &page) in base.iter().enumerate() {
        range.push(PageItem::Page(page));
        if let Some(&next) = base.get(i + 1) {
            match next - page {
                2 => range.push(PageItem::Page(page + 1)),
                d if d > 2 => range.push(PageItem::Ellipsis),
                _ => {}
            }
        }
    }

    range
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis, Page};

    #[test]
    fn short_lists_show_everything() {
        assert_eq!(page_range(1, 1), vec![Page(1)]);
        assert_eq!(page_range(3, 5), vec![Page(1), Page(2), Page(3), Page(4), Page(5)]);
    }

    #[test]
    fn first_page_of_many() {
        assert_eq!(page_range(1, 15), vec![Page(1), Page(2), Page(3), Ellipsis, Page(15)]);
    }

    #[test]
    fn last_page_of_many() {
        assert_eq!(page_range(15, 15), vec![Page(1), Ellipsis, Page(13), Page(14), Page(15)]);
    }

    #[test]
    fn middle_page() {
        assert_eq!(
            page_range(8, 15),
            vec![Page(1), Ellipsis, Page(7), Page(8), Page(9), Ellipsis, Page(15)]
        );
    }

    #[test]
    fn single_gap_is_filled() {
        // 1 _ 3 4 5 ... 15: the gap at 2 is one page wide
        assert_eq!(
            page_range(4, 15),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(15)]
        );
    }

    #[test]
    fn out_of_range_current_is_clamped() {
        assert_eq!(page_range(0, 6), page_range(1, 6));
        assert_eq!(page_range(99, 6), page_range(6, 6));
    }

    #[test]
    fn serializes_ellipsis_as_string() {
        let json = serde_json::to_string(&page_range(1, 10)).unwrap();
        assert_eq!(json, r#"[1,2,3,"...",10]"#);
    }
}
