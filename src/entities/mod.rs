//! SeaORM entities for halaqah rosters, study pairings, enrollment
//! confirmations, and user profiles.

pub mod halaqah;
pub mod halaqah_student;
pub mod study_partner;
pub mod submission;
pub mod user;

// Re-export specific types to avoid conflicts
pub use halaqah::{Column as HalaqahColumn, Entity as Halaqah, Model as HalaqahModel};
pub use halaqah_student::{
    Column as HalaqahStudentColumn, EnrollmentStatus, Entity as HalaqahStudent,
    Model as HalaqahStudentModel,
};
pub use study_partner::{
    Column as StudyPartnerColumn, Entity as StudyPartner, Model as StudyPartnerModel,
    PairingStatus, PairingType,
};
pub use submission::{
    Column as SubmissionColumn, Entity as Submission, Model as SubmissionModel,
    SubmissionPairingStatus, SubmissionStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
