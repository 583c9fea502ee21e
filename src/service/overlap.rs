use chrono::NaiveDate;

/// Inclusive ranges `[a1, a2]` and `[b1, b2]` share a day iff
/// `a1 <= b2 && b1 <= a2`.
pub fn ranges_overlap(a1: NaiveDate, a2: NaiveDate, b1: NaiveDate, b2: NaiveDate) -> bool {
    a1 <= b2 && b1 <= a2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn shared_boundary_day_overlaps() {
        assert!(ranges_overlap(day(1, 1), day(1, 3), day(1, 3), day(1, 5)));
        assert!(ranges_overlap(day(1, 3), day(1, 5), day(1, 1), day(1, 3)));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        assert!(!ranges_overlap(day(1, 1), day(1, 3), day(1, 4), day(1, 6)));
        assert!(!ranges_overlap(day(1, 4), day(1, 6), day(1, 1), day(1, 3)));
    }

    #[test]
    fn containment_overlaps() {
        assert!(ranges_overlap(day(1, 1), day(1, 31), day(1, 10), day(1, 10)));
        assert!(ranges_overlap(day(1, 10), day(1, 10), day(1, 1), day(1, 31)));
    }
}
