use super::record::FileRecord;

/// Borrow the requested window of `records`.
///
/// `start` is clamped to zero. A `count` of zero means "to the end"; a
/// negative `count` means "all but the last `-count` records".
pub fn paginate(records: &[FileRecord], start: i64, count: i64) -> Vec<&FileRecord> {
    let total = records.len() as i64;
    let offset = start.max(0);
    let end = match count {
        0 => total,
        n if n > 0 => offset.saturating_add(n).min(total),
        n => (total + n).max(0),
    };
    if offset >= end {
        return Vec::new();
    }
    records[offset as usize..end as usize].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<FileRecord> {
        (0..n)
            .map(|i| FileRecord {
                name: format!("f{}", i),
                path: format!("f{}", i),
                size: 0,
                modified: 0,
                is_directory: false,
                is_hidden: false,
                is_symlink: false,
                is_expanded: false,
                children: Vec::new(),
            })
            .collect()
    }

    fn names(page: &[&FileRecord]) -> Vec<String> {
        page.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn zero_count_returns_rest() {
        let all = records(5);
        assert_eq!(names(&paginate(&all, 0, 0)).len(), 5);
        assert_eq!(names(&paginate(&all, 3, 0)), ["f3", "f4"]);
    }

    #[test]
    fn positive_count_limits_page() {
        let all = records(5);
        assert_eq!(names(&paginate(&all, 1, 2)), ["f1", "f2"]);
        assert_eq!(names(&paginate(&all, 4, 10)), ["f4"]);
    }

    #[test]
    fn negative_count_drops_the_tail() {
        let all = records(5);
        assert_eq!(names(&paginate(&all, 0, -2)), ["f0", "f1", "f2"]);
        assert_eq!(names(&paginate(&all, 1, -2)), ["f1", "f2"]);
        assert!(paginate(&all, 0, -9).is_empty());
    }

    #[test]
    fn out_of_range_start_is_empty_or_clamped() {
        let all = records(5);
        assert!(paginate(&all, 7, 0).is_empty());
        assert_eq!(paginate(&all, -3, 1).len(), 1);
        assert!(paginate(&[], 0, 0).is_empty());
    }
}
