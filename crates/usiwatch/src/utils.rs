use crate::types::CourseRecord;

#[derive(Debug, PartialEq, Eq)]
pub struct CourseStats {
    pub open: usize,
    pub fully_booked: usize,
    pub total: usize,
}

impl CourseStats {
    pub fn from_course_records(records: &[CourseRecord]) -> CourseStats {
        let fully_booked = records.iter().filter(|r| r.is_fully_booked()).count();
        CourseStats {
            open: records.len() - fully_booked,
            fully_booked,
            total: records.len(),
        }
    }
}

impl std::fmt::Display for CourseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Open courses:         {}", self.open)?;
        writeln!(f, "  Fully booked courses: {}", self.fully_booked)?;
        writeln!(f, "  Total:                {}", self.total)
    }
}
