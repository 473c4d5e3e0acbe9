use crate::api::employee::CreateEmployeeForm;
use crate::model::activity_log::ActivityLog;
use crate::model::employee::Employee;
use crate::model::timesheet::{Activity, Timesheet, TimesheetStatus};
use crate::models::{LoginReqDto, LoginResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock API",
        version = "1.0.0",
        description = r#"
## HR / Timesheet Backend

Employee directory with profile-picture upload, plus a punch-in/punch-out
timesheet workflow with an append-only activity log.

### Timesheet states
`PUNCHED_IN` → `ON_LUNCH` / `ON_BREAK` → back to `PUNCHED_IN` → `PUNCHED_OUT`
(terminal). Accumulated work/lunch/break seconds are derived from wall-clock
segment boundaries; at most one open timesheet exists per employee.

### Security
Timesheet endpoints require a **JWT bearer token** obtained from
`/api/auth/login` (office email + password).

Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::timesheet::punch_in,
        crate::api::timesheet::lunch_in,
        crate::api::timesheet::lunch_out,
        crate::api::timesheet::break_in,
        crate::api::timesheet::break_out,
        crate::api::timesheet::punch_out,
        crate::api::timesheet::current,
        crate::api::timesheet::history,
        crate::api::timesheet::activity_log
    ),
    components(
        schemas(
            Employee,
            CreateEmployeeForm,
            Timesheet,
            TimesheetStatus,
            Activity,
            ActivityLog,
            LoginReqDto,
            LoginResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token lifecycle"),
        (name = "Employee", description = "Employee directory APIs"),
        (name = "Timesheet", description = "Punch-in/out workflow APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        // components exist because schemas are registered above
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
