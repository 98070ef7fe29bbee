use chrono::{DateTime, TimeZone};

/// Parse a step filter such as `thermal` or `[thermal, rve]` into names.
///
/// Brackets and spaces are stripped before splitting on commas. `None` means
/// "no filter".
pub fn str_to_list(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(|s| {
        s.replace(['[', ']', ' '], "")
            .split(',')
            .map(str::to_string)
            .collect()
    })
}

/// Timestamp format written into settings and sync metadata.
pub fn strf_datetime<Tz: TimeZone>(when: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    when.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_name() {
        assert_eq!(str_to_list(Some("thermal")), Some(vec!["thermal".to_string()]));
    }

    #[test]
    fn bracketed_list() {
        assert_eq!(
            str_to_list(Some("[thermal, rve]")),
            Some(vec!["thermal".to_string(), "rve".to_string()])
        );
    }

    #[test]
    fn no_filter() {
        assert_eq!(str_to_list(None), None);
    }

    #[test]
    fn datetime_format() {
        let t = chrono::Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(strf_datetime(&t), "2024-03-05 07:08:09");
    }

    proptest! {
        #[test]
        fn names_survive_formatting(names in prop::collection::vec("[a-z_][a-z0-9_]{0,8}", 1..6)) {
            let raw = format!("[{}]", names.join(", "));
            prop_assert_eq!(str_to_list(Some(&raw)), Some(names));
        }
    }
}
