use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "first_name": "John",
        "middle_name": null,
        "last_name": "Doe",
        "department": "Engineering",
        "designation": "Software Engineer",
        "mobile_number": "9876543210",
        "office_email": "john.doe@company.com",
        "personal_email": "john@gmail.com",
        "technology": "Rust",
        "skype_id": null,
        "employment_type": "full-time",
        "birth_date": "1994-05-12",
        "joining_date": "2024-01-01",
        "aadhar_card": null,
        "pan_card": null,
        "gender": "male",
        "role": "employee",
        "profile_pic": "/uploads/1724919000123.png"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "John")]
    pub first_name: String,

    pub middle_name: Option<String>,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = "Software Engineer")]
    pub designation: String,

    #[schema(example = "9876543210")]
    pub mobile_number: String,

    #[schema(example = "john.doe@company.com")]
    pub office_email: String,

    #[schema(example = "john@gmail.com")]
    pub personal_email: String,

    /// Argon2 hash. Never serialized out.
    #[serde(skip_serializing)]
    #[schema(write_only)]
    pub password: String,

    pub technology: Option<String>,
    pub skype_id: Option<String>,
    pub employment_type: Option<String>,

    #[schema(example = "1994-05-12", value_type = Option<String>, format = "date")]
    pub birth_date: Option<NaiveDate>,

    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub joining_date: Option<NaiveDate>,

    pub aadhar_card: Option<String>,
    pub pan_card: Option<String>,
    pub gender: Option<String>,
    pub role: Option<String>,

    /// Relative path under /uploads, e.g. "/uploads/1724919000123.png".
    pub profile_pic: Option<String>,
}
