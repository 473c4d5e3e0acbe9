use crate::{
    auth::password::hash_password,
    config::Config,
    error::{ApiError, is_duplicate_key},
    model::employee::Employee,
    upload::{MAX_IMAGE_BYTES, remove_image, store_image, validate_image_name},
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

/// Columns a PUT may touch. Everything else (id, password) is off limits.
const UPDATABLE_COLUMNS: &[&str] = &[
    "first_name",
    "middle_name",
    "last_name",
    "department",
    "designation",
    "mobile_number",
    "office_email",
    "personal_email",
    "technology",
    "skype_id",
    "employment_type",
    "birth_date",
    "joining_date",
    "aadhar_card",
    "pan_card",
    "gender",
    "role",
    "profile_pic",
];

/// Swagger shape of the create form. The handler itself reads the raw
/// multipart stream.
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct CreateEmployeeForm {
    #[schema(example = "John")]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[schema(example = "Doe")]
    pub last_name: String,
    pub department: String,
    pub designation: String,
    #[schema(example = "9876543210")]
    pub mobile_number: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub office_email: String,
    #[schema(example = "john@gmail.com", format = "email")]
    pub personal_email: String,
    pub password: String,
    pub confirm_password: String,
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
    /// Profile picture (jpeg/jpg/png/gif, max 5 MiB).
    #[schema(value_type = String, format = Binary)]
    pub profile_pic: String,
}

struct UploadedFile {
    name: String,
    bytes: Vec<u8>,
}

struct ParsedForm {
    fields: Map<String, Value>,
    file: Option<UploadedFile>,
}

/// Drains a multipart request into text fields plus at most one
/// `profile_pic` file, buffered in memory. The extension is checked here so
/// a bad upload fails before anything touches disk.
async fn read_form(payload: &mut Multipart) -> Result<ParsedForm, ApiError> {
    let mut fields = Map::new();
    let mut file: Option<UploadedFile> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart payload".into()))?
    {
        let name = field.name().to_string();
        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_string);

        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|_| ApiError::Validation("Malformed multipart payload".into()))?
        {
            if buf.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::Validation("File too large (max 5 MiB)".into()));
            }
            buf.extend_from_slice(&chunk);
        }

        if name == "profile_pic" {
            let filename =
                filename.ok_or_else(|| ApiError::Validation("No file uploaded".into()))?;
            validate_image_name(&filename)?;
            file = Some(UploadedFile {
                name: filename,
                bytes: buf,
            });
        } else {
            let text = String::from_utf8(buf)
                .map_err(|_| ApiError::Validation(format!("Field {} is not valid UTF-8", name)))?;
            fields.insert(name, Value::String(text));
        }
    }

    Ok(ParsedForm { fields, file })
}

fn require<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str, ApiError> {
    match fields.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim()),
        _ => Err(ApiError::Validation(
            "All required fields must be filled".into(),
        )),
    }
}

fn optional(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_date(fields: &Map<String, Value>, key: &str) -> Result<Option<NaiveDate>, ApiError> {
    match optional(fields, key) {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::Validation(format!("{} must be YYYY-MM-DD", key))),
        None => Ok(None),
    }
}

fn is_valid_email(s: &str) -> bool {
    let mut parts = s.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.contains(char::is_whitespace)
        }
        _ => false,
    }
}

fn is_valid_mobile(s: &str) -> bool {
    s.len() == 10 && s.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug)]
struct NewEmployee {
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    department: String,
    designation: String,
    mobile_number: String,
    office_email: String,
    personal_email: String,
    password: String,
    technology: Option<String>,
    skype_id: Option<String>,
    employment_type: Option<String>,
    birth_date: Option<NaiveDate>,
    joining_date: Option<NaiveDate>,
    aadhar_card: Option<String>,
    pan_card: Option<String>,
    gender: Option<String>,
    role: Option<String>,
}

/// All field validation happens here, before anything is written anywhere.
fn validate_new_employee(fields: &Map<String, Value>) -> Result<NewEmployee, ApiError> {
    let first_name = require(fields, "first_name")?.to_string();
    let last_name = require(fields, "last_name")?.to_string();
    let department = require(fields, "department")?.to_string();
    let designation = require(fields, "designation")?.to_string();
    let mobile_number = require(fields, "mobile_number")?.to_string();
    let office_email = require(fields, "office_email")?.to_string();
    let personal_email = require(fields, "personal_email")?.to_string();
    let password = require(fields, "password")?.to_string();
    let confirm_password = require(fields, "confirm_password")?.to_string();

    if !is_valid_email(&office_email) || !is_valid_email(&personal_email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }

    if !is_valid_mobile(&mobile_number) {
        return Err(ApiError::Validation(
            "Mobile number must be 10 digits".into(),
        ));
    }

    if password != confirm_password {
        return Err(ApiError::Validation("Passwords do not match".into()));
    }

    Ok(NewEmployee {
        first_name,
        middle_name: optional(fields, "middle_name"),
        last_name,
        department,
        designation,
        mobile_number,
        office_email,
        personal_email,
        password,
        technology: optional(fields, "technology"),
        skype_id: optional(fields, "skype_id"),
        employment_type: optional(fields, "employment_type"),
        birth_date: optional_date(fields, "birth_date")?,
        joining_date: optional_date(fields, "joining_date")?,
        aadhar_card: optional(fields, "aadhar_card"),
        pan_card: optional(fields, "pan_card"),
        gender: optional(fields, "gender"),
        role: optional(fields, "role"),
    })
}

/// Explicit parse so a malformed id is a 400, not a routing 404.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::Validation("Invalid Employee ID".into()))
}

async fn fetch_employee(pool: &MySqlPool, id: u64) -> Result<Option<Employee>, ApiError> {
    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(employee)
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body(
        content = CreateEmployeeForm,
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 201, description = "Employee created successfully"),
        (status = 400, description = "Validation error or duplicate office email"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    mut payload: Multipart,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let form = read_form(&mut payload).await?;

    let file = form
        .file
        .ok_or_else(|| ApiError::Validation("No file uploaded".into()))?;
    let new = validate_new_employee(&form.fields)?;

    let hashed = hash_password(&new.password);
    let stored = store_image(&config.upload_dir, &file.name, file.bytes).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (first_name, middle_name, last_name, department, designation,
         mobile_number, office_email, personal_email, password, technology,
         skype_id, employment_type, birth_date, joining_date, aadhar_card,
         pan_card, gender, role, profile_pic)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.first_name)
    .bind(&new.middle_name)
    .bind(&new.last_name)
    .bind(&new.department)
    .bind(&new.designation)
    .bind(&new.mobile_number)
    .bind(&new.office_email)
    .bind(&new.personal_email)
    .bind(&hashed)
    .bind(&new.technology)
    .bind(&new.skype_id)
    .bind(&new.employment_type)
    .bind(new.birth_date)
    .bind(new.joining_date)
    .bind(&new.aadhar_card)
    .bind(&new.pan_card)
    .bind(&new.gender)
    .bind(&new.role)
    .bind(&stored.rel_path)
    .execute(pool.get_ref())
    .await;

    let id = match result {
        Ok(res) => res.last_insert_id(),
        Err(e) => {
            // The file is already on disk; clean it up before reporting.
            remove_image(&config.upload_dir, &stored.rel_path);
            if is_duplicate_key(&e) {
                return Err(ApiError::Conflict(
                    "Employee already exists with this office email".into(),
                ));
            }
            error!(error = %e, "Failed to create employee");
            return Err(ApiError::Internal);
        }
    };

    let employee = fetch_employee(pool.get_ref(), id)
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Employee created successfully",
        "employee": employee
    })))
}

/// List all employees. The password hash is never serialized.
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "Employee list", body = [Employee]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn list_employees(pool: web::Data<MySqlPool>) -> Result<impl Responder, ApiError> {
    let employees =
        sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY id DESC")
            .fetch_all(pool.get_ref())
            .await?;

    Ok(HttpResponse::Ok().json(employees))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 400, description = "Malformed employee ID"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let id = parse_id(&path.into_inner())?;

    let employee = fetch_employee(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;

    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee. Merges the provided fields; a new profile picture
/// replaces and deletes the old file.
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    request_body(
        content = CreateEmployeeForm,
        description = "Any subset of the employee fields, optionally with a new profile_pic",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Employee updated successfully"),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    mut payload: Multipart,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let id = parse_id(&path.into_inner())?;

    let existing = fetch_employee(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;

    let form = read_form(&mut payload).await?;
    let mut fields = form.fields;

    let new_image = match form.file {
        Some(f) => Some(store_image(&config.upload_dir, &f.name, f.bytes).await?),
        None => None,
    };
    if let Some(img) = &new_image {
        fields.insert("profile_pic".to_string(), Value::String(img.rel_path.clone()));
    }

    let cleanup_new = |img: &Option<crate::upload::StoredImage>| {
        if let Some(img) = img {
            remove_image(&config.upload_dir, &img.rel_path);
        }
    };

    let update = match build_update_sql("employees", &fields, UPDATABLE_COLUMNS, "id", id) {
        Ok(u) => u,
        Err(e) => {
            cleanup_new(&new_image);
            return Err(e);
        }
    };

    if let Err(e) = execute_update(pool.get_ref(), update).await {
        cleanup_new(&new_image);
        if is_duplicate_key(&e) {
            return Err(ApiError::Conflict(
                "Employee already exists with this office email".into(),
            ));
        }
        error!(error = %e, employee_id = id, "Failed to update employee");
        return Err(ApiError::Internal);
    }

    // The replaced picture is dead weight once the row points elsewhere.
    if new_image.is_some() {
        if let Some(old) = &existing.profile_pic {
            remove_image(&config.upload_dir, old);
        }
    }

    let employee = fetch_employee(pool.get_ref(), id)
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully",
        "employee": employee
    })))
}

/// Delete Employee, including the stored profile picture.
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted successfully"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let id = parse_id(&path.into_inner())?;

    let existing = fetch_employee(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;

    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if let Some(pic) = &existing.profile_pic {
        remove_image(&config.upload_dir, pic);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;

    fn base_fields() -> Map<String, Value> {
        let mut m = Map::new();
        for (k, v) in [
            ("first_name", "John"),
            ("last_name", "Doe"),
            ("department", "Engineering"),
            ("designation", "Engineer"),
            ("mobile_number", "9876543210"),
            ("office_email", "john.doe@company.com"),
            ("personal_email", "john@gmail.com"),
            ("password", "s3cret"),
            ("confirm_password", "s3cret"),
        ] {
            m.insert(k.to_string(), Value::String(v.to_string()));
        }
        m
    }

    #[test]
    fn valid_form_passes() {
        let mut fields = base_fields();
        fields.insert("joining_date".into(), Value::String("2024-01-01".into()));
        let new = validate_new_employee(&fields).unwrap();
        assert_eq!(new.office_email, "john.doe@company.com");
        assert_eq!(new.joining_date, Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(new.middle_name, None);
    }

    #[test]
    fn password_mismatch_is_validation_error() {
        let mut fields = base_fields();
        fields.insert("confirm_password".into(), Value::String("different".into()));
        let err = validate_new_employee(&fields).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Passwords do not match");
    }

    #[test]
    fn missing_required_field_rejected() {
        let mut fields = base_fields();
        fields.remove("department");
        assert!(validate_new_employee(&fields).is_err());
    }

    #[test]
    fn email_and_mobile_rules() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@c.co"));

        assert!(is_valid_mobile("0123456789"));
        assert!(!is_valid_mobile("12345"));
        assert!(!is_valid_mobile("12345abcde"));
    }

    #[test]
    fn malformed_id_is_validation_error() {
        assert_eq!(parse_id("12").unwrap(), 12);
        let err = parse_id("abc").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(parse_id("-4").is_err());
    }

    #[test]
    fn bad_date_rejected() {
        let mut fields = base_fields();
        fields.insert("birth_date".into(), Value::String("12/05/1994".into()));
        assert!(validate_new_employee(&fields).is_err());
    }
}
