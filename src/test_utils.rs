use crate::models::domain::{Question, QuestionOption, StudentProfile, Test};
