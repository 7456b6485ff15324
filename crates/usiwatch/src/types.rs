use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Substring the portal prepends to the course number of a fully booked course.
pub const FULLY_BOOKED_MARKER: &str = "AUSG";

/// Cell texts of one physical `<tr>` after row and column spans were expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTableRow(pub Vec<String>);

impl RawTableRow {
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RawTableRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        RawTableRow(iter.into_iter().map(Into::into).collect())
    }
}

/// One offered course, folded together from a triple of table rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: String,
    pub course: String,
    pub time: String,
    pub location: String,
    pub rate_a: String,
    pub rate_b: String,
    pub rate_c: String,
    pub instructor: String,
    pub num_free_text: String,
    pub free_text: String,
}

impl CourseRecord {
    pub fn is_fully_booked(&self) -> bool {
        self.id.contains(FULLY_BOOKED_MARKER)
    }
}

impl Display for CourseRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[{}] {} — {}", self.id, self.course, self.time)?;
        writeln!(f, "     Location:   {}", self.location)?;
        writeln!(
            f,
            "     Rates:      {} / {} / {}",
            self.rate_a, self.rate_b, self.rate_c
        )?;
        writeln!(f, "     Instructor: {}", self.instructor)?;
        write!(f, "     Free:       {}", self.num_free_text)?;
        if !self.free_text.is_empty() {
            write!(f, " ({})", self.free_text)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyEntry {
    pub course_key: String,
    pub free_count: u32,
    pub fully_booked: bool,
}

impl Display for VacancyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} free", self.course_key, self.free_count)?;
        if self.fully_booked {
            write!(f, " (fully booked)")?;
        }
        Ok(())
    }
}
