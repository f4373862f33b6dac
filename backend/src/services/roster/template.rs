use actix_web::{HttpResponse, Responder};

/// The canonical upload header plus one sample row per role. What the
/// dashboard's "Download template" link serves.
pub const TEMPLATE_CSV: &str = "\
role,first_name,last_name,email,student_id,department,class_year,phone_number,password
student,Maria,Lopez,maria.lopez@example.edu,S2026-014,Mathematics,2026,555-0143,
teacher,James,Okafor,james.okafor@example.edu,,Physics,,555-0112,chalkdust
";

pub async fn process() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"user_upload_template.csv\"",
        ))
        .body(TEMPLATE_CSV)
}
