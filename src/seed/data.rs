use crate::model::GradeLevel;
use crate::store::memory::{AcademicYear, ClassroomEntry, EnrollmentEntry, MemoryStore, School};
use log::info;

/// Counts of what `load_seed_data` inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub schools: usize,
    pub classrooms: usize,
    pub enrollments: usize,
}

const STUDENT_NAMES: &[&str] = &[
    "Ada Byron",
    "Émile Zola",
    "Zoë Saldaña",
    "Alan Turing",
    "Grace Hopper",
    "Søren Kierkegaard",
    "Björk Guðmundsdóttir",
    "Edsger Dijkstra",
    "Barbara Liskov",
    "Chloé Zhao",
    "Donald Knuth",
    "Frances Allen",
    "Ángel Di María",
    "Katherine Johnson",
    "Niklaus Wirth",
    "Óscar Niemeyer",
    "Radia Perlman",
    "Ken Thompson",
];

fn academic_years() -> Vec<AcademicYear> {
    vec![
        AcademicYear::new("2024", "2024/2025"),
        AcademicYear::new("2025", "2025/2026"),
    ]
}

fn grade_levels() -> Vec<GradeLevel> {
    vec![
        GradeLevel {
            grade_level_id: "g7".to_string(),
            name: "Grade 7".to_string(),
        },
        GradeLevel {
            grade_level_id: "g8".to_string(),
            name: "Grade 8".to_string(),
        },
    ]
}

/// Load two demo schools with classrooms and students for every year and grade.
///
/// Ids are deterministic, e.g. classroom `north-g7-2025-a` and enrollment
/// `north-g7-2025-e03`. A third of the students start out assigned and the
/// first classroom of each grade is small enough to fill up quickly.
pub fn load_seed_data(store: &MemoryStore) -> SeedSummary {
    let schools = [
        ("north", "Northside Secondary"),
        ("river", "Riverside Academy"),
    ];

    let mut summary = SeedSummary {
        schools: 0,
        classrooms: 0,
        enrollments: 0,
    };

    for (school_id, school_name) in schools {
        store.upsert_school(School {
            school_id: school_id.to_string(),
            name: school_name.to_string(),
            grade_levels: grade_levels(),
        });
        summary.schools += 1;

        for year in academic_years() {
            for grade in grade_levels() {
                let prefix = format!("{}-{}-{}", school_id, grade.grade_level_id, year.year_id);
                let classrooms = [("a", 4), ("b", 24), ("c", 28)];

                for (suffix, capacity) in classrooms {
                    store.upsert_classroom(ClassroomEntry {
                        classroom_id: format!("{}-{}", prefix, suffix),
                        school_id: school_id.to_string(),
                        grade_level_id: grade.grade_level_id.clone(),
                        academic_year: year.clone(),
                        name: format!("{}{}", &grade.name[6..], suffix.to_uppercase()),
                        capacity,
                    });
                    summary.classrooms += 1;
                }

                for (n, name) in STUDENT_NAMES.iter().enumerate() {
                    let classroom_id = match n % 6 {
                        0 => Some(format!("{}-a", prefix)),
                        3 => Some(format!("{}-b", prefix)),
                        _ => None,
                    };
                    store.upsert_enrollment(EnrollmentEntry {
                        enrollment_id: format!("{}-e{:02}", prefix, n),
                        student_id: format!("{}-s{:02}", school_id, n),
                        student_name: name.to_string(),
                        school_id: school_id.to_string(),
                        grade_level_id: grade.grade_level_id.clone(),
                        academic_year: year.clone(),
                        classroom_id,
                    });
                    summary.enrollments += 1;
                }
            }
        }
    }

    info!(
        "Seeded {} schools, {} classrooms, {} enrollments",
        summary.schools, summary.classrooms, summary.enrollments
    );
    summary
}
