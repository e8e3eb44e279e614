use chrono::{DateTime, Utc};

/// Median of a sample; the average of the two middle values for even sizes.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Hours from `start` to `end`. None when either endpoint is missing,
/// clamped to zero so clock skew never yields a negative duration.
pub fn hours_between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<f64> {
    let (start, end) = (start?, end?);
    let seconds = (end - start).num_seconds();
    Some(seconds.max(0) as f64 / 3600.0)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn median_of_empty_is_none() {
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn median_of_singleton_is_the_value() {
        assert_eq!(median(&[7.0]), Some(7.0));
    }

    #[test]
    fn median_of_even_sample_averages_middles() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn median_sorts_its_input() {
        assert_eq!(median(&[9.0, 1.0, 5.0]), Some(5.0));
    }

    #[test]
    fn hours_between_none_when_endpoint_missing() {
        assert_eq!(hours_between(None, Some(at(1))), None);
        assert_eq!(hours_between(Some(at(1)), None), None);
    }

    #[test]
    fn hours_between_clamps_negative_to_zero() {
        assert_eq!(hours_between(Some(at(5)), Some(at(1))), Some(0.0));
    }

    #[test]
    fn hours_between_simple() {
        assert_eq!(hours_between(Some(at(1)), Some(at(4))), Some(3.0));
    }

    #[test]
    fn round1_rounds_to_one_decimal() {
        assert_eq!(round1(33.333), 33.3);
        assert_eq!(round1(66.66), 66.7);
    }
}
