use crate::model::common::is_blank;
use crate::model::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which flavour of academic period a screen selects by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMode {
    #[default]
    AcademicYearId,
    AcademicYearName,
}

impl PeriodMode {
    /// Wrap a raw selector value as a period of this flavour
    pub fn period(self, raw: impl Into<String>) -> Period {
        match self {
            PeriodMode::AcademicYearId => Period::AcademicYearId(raw.into()),
            PeriodMode::AcademicYearName => Period::AcademicYearName(raw.into()),
        }
    }
}

/// An academic period, identified either by year id or by year name ("2024/2025").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Period {
    AcademicYearId(Id),
    AcademicYearName(String),
}

impl Period {
    pub fn mode(&self) -> PeriodMode {
        match self {
            Period::AcademicYearId(_) => PeriodMode::AcademicYearId,
            Period::AcademicYearName(_) => PeriodMode::AcademicYearName,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Period::AcademicYearId(value) | Period::AcademicYearName(value) => value,
        }
    }

    pub fn is_blank(&self) -> bool {
        is_blank(self.value())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// The fully resolved (school, period, grade level) scope of a roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterContext {
    pub school_id: Id,
    pub period: Period,
    pub grade_level_id: Id,
}

impl FilterContext {
    pub fn new(school_id: impl Into<Id>, period: Period, grade_level_id: impl Into<Id>) -> Self {
        Self {
            school_id: school_id.into(),
            period,
            grade_level_id: grade_level_id.into(),
        }
    }
}

impl fmt::Display for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "school={} period={} grade={}",
            self.school_id, self.period, self.grade_level_id
        )
    }
}

/// The partial selection a user builds one dropdown at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub school_id: Option<Id>,
    pub period: Option<Period>,
    pub grade_level_id: Option<Id>,
}

impl FilterSelection {
    /// Returns a context only when all three fields are present and non-blank
    pub fn resolve(&self) -> Option<FilterContext> {
        let school_id = self.school_id.as_ref().filter(|id| !is_blank(id))?;
        let period = self.period.as_ref().filter(|p| !p.is_blank())?;
        let grade_level_id = self.grade_level_id.as_ref().filter(|id| !is_blank(id))?;

        Some(FilterContext {
            school_id: school_id.clone(),
            period: period.clone(),
            grade_level_id: grade_level_id.clone(),
        })
    }

    pub fn has_school(&self) -> bool {
        self.school_id.as_deref().is_some_and(|id| !is_blank(id))
    }

    pub fn has_period(&self) -> bool {
        self.period.as_ref().is_some_and(|p| !p.is_blank())
    }
}
