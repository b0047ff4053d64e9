use regex::Regex;

/// Run identifier used to name the per-run artifact directory.
pub fn new_run_id(org_name: &str) -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}", sanitize(org_name), stamp)
}

/// Replace characters that aren't safe for filenames.
pub fn sanitize(value: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9\-_\.]").unwrap();
    re.replace_all(value, "_").to_string()
}
