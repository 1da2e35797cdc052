use super::*;

// =============================================================================
// Role
// =============================================================================

#[test]
fn role_parses_case_insensitively() {
    assert_eq!("Contractor".parse::<Role>(), Ok(Role::Contractor));
    assert_eq!(" admin ".parse::<Role>(), Ok(Role::Admin));
    assert_eq!("salesperson".parse::<Role>(), Ok(Role::Salesperson));
}

#[test]
fn role_rejects_homeowner() {
    let err = "homeowner".parse::<Role>().unwrap_err();
    assert_eq!(err, UnknownRole("homeowner".into()));
}

#[test]
fn admin_grants_every_role() {
    for required in Role::ALL {
        assert!(Role::Admin.grants(required), "admin should grant {required}");
    }
}

#[test]
fn non_admin_grants_only_itself() {
    assert!(Role::Contractor.grants(Role::Contractor));
    assert!(!Role::Contractor.grants(Role::Salesperson));
    assert!(!Role::Contractor.grants(Role::Admin));
    assert!(!Role::Salesperson.grants(Role::Admin));
}

// =============================================================================
// User serde
// =============================================================================

#[test]
fn user_deserializes_numeric_id_and_camel_case() {
    let json = r#"{
        "id": 1,
        "username": "alexneilson02",
        "fullName": "Alex Neilson",
        "email": "alex@example.com",
        "role": "salesperson"
    }"#;
    let user: User = serde_json::from_str(json).unwrap();
    assert_eq!(user.id, "1");
    assert_eq!(user.full_name, "Alex Neilson");
    assert_eq!(user.role, Role::Salesperson);
    assert!(user.avatar_url.is_none());
}

#[test]
fn user_deserializes_string_id_and_avatar() {
    let json = r#"{
        "id": "c-9",
        "username": "bob",
        "fullName": "Bob Builder",
        "email": "bob@example.com",
        "role": "contractor",
        "avatarUrl": "https://cdn.example.com/bob.png"
    }"#;
    let user: User = serde_json::from_str(json).unwrap();
    assert_eq!(user.id, "c-9");
    assert_eq!(user.avatar_url.as_deref(), Some("https://cdn.example.com/bob.png"));
}

#[test]
fn user_with_unknown_role_fails() {
    let json = r#"{"id":2,"username":"h","fullName":"H","email":"h@x.io","role":"homeowner"}"#;
    assert!(serde_json::from_str::<User>(json).is_err());
}

#[test]
fn current_user_defaults_role_data_to_null() {
    let json = r#"{"user":{"id":3,"username":"a","fullName":"A","email":"a@x.io","role":"admin"}}"#;
    let current: CurrentUser = serde_json::from_str(json).unwrap();
    assert_eq!(current.user.role, Role::Admin);
    assert!(current.role_data.is_null());
}

#[test]
fn login_response_redirect_is_optional() {
    let json = r#"{"token":"abc","user":{"id":1,"username":"a","fullName":"A","email":"a@x.io","role":"admin"}}"#;
    let resp: LoginResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.token, "abc");
    assert!(resp.redirect_to.is_none());
}

// =============================================================================
// Credentials
// =============================================================================

#[test]
fn credentials_debug_redacts_password() {
    let creds = Credentials::new("alexneilson02", "password123");
    let debug = format!("{creds:?}");
    assert!(debug.contains("alexneilson02"));
    assert!(!debug.contains("password123"));
}
