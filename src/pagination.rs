use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
            has_more: self.has_more,
        }
    }
}

/// Slice `[offset, offset + limit)` out of `items`.
pub fn paginate<T: Clone>(items: &[T], offset: usize, limit: usize) -> Paginated<T> {
    let total = items.len();
    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    Paginated {
        items: items[start..end].to_vec(),
        total,
        offset,
        limit,
        has_more: offset.saturating_add(limit) < total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_length_and_has_more() {
        let items: Vec<u32> = (0..10).collect();
        for offset in 0..13 {
            for limit in 1..12 {
                let page = paginate(&items, offset, limit);
                let expected = limit.min(10usize.saturating_sub(offset));
                assert_eq!(page.items.len(), expected, "offset={offset} limit={limit}");
                assert_eq!(page.has_more, offset + limit < 10);
                assert_eq!(page.total, 10);
            }
        }
    }

    #[test]
    fn offset_past_end_is_empty() {
        let page = paginate(&[1, 2, 3], 7, 5);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.offset, 7);
        assert_eq!(page.limit, 5);
    }
}
