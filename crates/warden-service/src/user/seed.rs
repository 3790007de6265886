//! Demo account seeding.

use tracing::info;

use warden_core::AppResult;

use super::service::{CreateUserRequest, UserService};

/// `(username, password, role)` of the demo accounts.
const DEMO_USERS: [(&str, &str, &str); 3] = [
    ("admin_user", "adminpassword", "admin"),
    ("manager_user", "managerpassword", "manager"),
    ("regular_user", "userpassword", "user"),
];

/// Create the demo accounts when the user store is empty.
///
/// Returns the number of users created.
pub async fn seed_demo_users(users: &UserService) -> AppResult<usize> {
    if users.count().await > 0 {
        return Ok(0);
    }
    for (username, password, role) in DEMO_USERS {
        users
            .register(CreateUserRequest {
                email: format!("{username}@example.com"),
                username: username.to_string(),
                password: password.to_string(),
                full_name: None,
                role: role.to_string(),
            })
            .await?;
    }
    info!(count = DEMO_USERS.len(), "Demo users seeded");
    Ok(DEMO_USERS.len())
}
