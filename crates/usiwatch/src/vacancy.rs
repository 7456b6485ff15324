use std::sync::LazyLock;

use regex::Regex;

use crate::types::{CourseRecord, FULLY_BOOKED_MARKER, VacancyEntry};

static RE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("invalid regex: digits"));

#[derive(Debug, thiserror::Error)]
pub enum VacancyError {
    #[error("Course {id}: no free slot count in '{text}'")]
    MissingCount { id: String, text: String },
    #[error("Course {id}: free slot count '{digits}' out of range")]
    CountOutOfRange { id: String, digits: String },
}

/// Course key for a raw id, and whether the id carried the fully booked marker.
pub fn course_key(id: &str) -> (String, bool) {
    if id.contains(FULLY_BOOKED_MARKER) {
        (id.replace(FULLY_BOOKED_MARKER, ""), true)
    } else {
        (id.to_string(), false)
    }
}

/// Value of the first run of decimal digits in `text`.
pub fn parse_free_count(id: &str, text: &str) -> Result<u32, VacancyError> {
    let digits = RE_DIGITS
        .find(text)
        .ok_or_else(|| VacancyError::MissingCount {
            id: id.to_string(),
            text: text.to_string(),
        })?
        .as_str();

    digits
        .parse::<u32>()
        .map_err(|_| VacancyError::CountOutOfRange {
            id: id.to_string(),
            digits: digits.to_string(),
        })
}

pub fn extract_vacancy(record: &CourseRecord) -> Result<VacancyEntry, VacancyError> {
    let (course_key, fully_booked) = course_key(&record.id);
    let free_count = parse_free_count(&record.id, &record.num_free_text)?;

    Ok(VacancyEntry {
        course_key,
        free_count,
        fully_booked,
    })
}

/// Extracts every record in order. A fully booked record without a count is
/// left out with a warning; any other record without a count aborts the
/// extraction. A missing count is never reported as zero.
pub fn extract_vacancies(records: &[CourseRecord]) -> Result<Vec<VacancyEntry>, VacancyError> {
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        match extract_vacancy(record) {
            Ok(entry) => entries.push(entry),
            Err(e) if record.is_fully_booked() => {
                log::warn!("Skipping fully booked course: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    log::debug!(
        "Extracted {} vacancy entries ({} fully booked)",
        entries.len(),
        entries.iter().filter(|e| e.fully_booked).count()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, num_free_text: &str) -> CourseRecord {
        CourseRecord {
            id: id.to_string(),
            course: "Yoga".to_string(),
            time: "Di 17:00-18:30".to_string(),
            location: "USZ".to_string(),
            rate_a: "30,00".to_string(),
            rate_b: "40,00".to_string(),
            rate_c: "50,00".to_string(),
            instructor: "Anna Steiner".to_string(),
            num_free_text: num_free_text.to_string(),
            free_text: String::new(),
        }
    }

    #[test]
    fn test_parse_free_count_first_digit_run() {
        assert_eq!(parse_free_count("1", "12 frei").unwrap(), 12);
        assert_eq!(parse_free_count("1", "noch 3 von 20 frei").unwrap(), 3);
        assert_eq!(parse_free_count("1", "007").unwrap(), 7);
    }

    #[test]
    fn test_parse_free_count_without_digits_fails() {
        match parse_free_count("101", "ausgebucht") {
            Err(VacancyError::MissingCount { id, text }) => {
                assert_eq!(id, "101");
                assert_eq!(text, "ausgebucht");
            }
            other => panic!("expected MissingCount, got {other:?}"),
        }
        assert!(parse_free_count("101", "").is_err());
    }

    #[test]
    fn test_parse_free_count_out_of_range() {
        assert!(matches!(
            parse_free_count("101", "99999999999 frei"),
            Err(VacancyError::CountOutOfRange { .. })
        ));
    }

    #[test]
    fn test_course_key_strips_marker() {
        assert_eq!(course_key("101"), ("101".to_string(), false));
        assert_eq!(course_key("AUSG0345"), ("0345".to_string(), true));
    }

    #[test]
    fn test_extract_vacancy_fully_booked() {
        let entry = extract_vacancy(&record("AUSG0345", "0 frei")).unwrap();

        assert_eq!(entry.course_key, "0345");
        assert_eq!(entry.free_count, 0);
        assert!(entry.fully_booked);
    }

    #[test]
    fn test_extract_vacancies_keeps_order_and_fails_on_missing_count() {
        let entries = extract_vacancies(&[record("101", "5 frei"), record("AUSG102", "0 frei")])
            .expect("Failed to extract");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].course_key, "101");
        assert_eq!(entries[0].free_count, 5);
        assert!(!entries[0].fully_booked);
        assert_eq!(entries[1].course_key, "102");

        let err = extract_vacancies(&[record("101", "5 frei"), record("103", "frei")]);
        assert!(matches!(err, Err(VacancyError::MissingCount { .. })));
    }

    #[test]
    fn test_extract_vacancies_skips_booked_course_without_count() {
        let entries = extract_vacancies(&[
            record("101", "5 frei"),
            record("AUSG102", "ausgebucht"),
            record("103", "noch 2 frei"),
        ])
        .expect("Failed to extract");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].course_key, "101");
        assert_eq!(entries[1].course_key, "103");
        assert_eq!(entries[1].free_count, 2);

        let err = extract_vacancies(&[record("AUSG102", "ausgebucht"), record("104", "offen")]);
        match err {
            Err(VacancyError::MissingCount { id, .. }) => assert_eq!(id, "104"),
            other => panic!("expected MissingCount, got {other:?}"),
        }
    }
}
