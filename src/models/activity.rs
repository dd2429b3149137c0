/// Audit entry shown on the form owner's dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: String,
    pub form_id: Option<String>,
    pub activity_type: &'static str,
    pub message: String,
}
