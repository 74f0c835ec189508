use crate::{
    auth::credentials::CredentialService,
    db::Database,
    dto::auth::{DeleteAccountResponse, LoginRequest, LoginResponse, RegisterRequest, UserResponse},
    error::AppError,
    repositories::users::{self as user_repo, NewUser, USERS},
    services::blob_store::BlobStore,
    telemetry::{BusinessEvent, redact_email},
    usecases::ownership::OwnershipCoordinator,
};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=20;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 5..=50;

pub struct UserServices;

impl UserServices {
    pub async fn register_user(
        db: &Database,
        credentials: &CredentialService,
        req: RegisterRequest,
    ) -> Result<LoginResponse, AppError> {
        let username = req.username.trim().to_string();
        let email = req.email.trim().to_string();
        if !USERNAME_LEN.contains(&username.chars().count()) {
            return Err(AppError::invalid_field(
                "username",
                "must be 3-20 characters",
            ));
        }
        if !is_valid_email(&email) {
            return Err(AppError::invalid_field("email", "must be a valid email address"));
        }
        if !PASSWORD_LEN.contains(&req.password.chars().count()) {
            return Err(AppError::invalid_field(
                "password",
                "must be 5-50 characters",
            ));
        }

        if user_repo::email_exists(db.pool(), &email).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        if user_repo::username_exists(db.pool(), &username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let password_hash = credentials.hash_password(&req.password)?;
        let user = USERS
            .insert(
                db.pool(),
                NewUser {
                    username,
                    email,
                    password_hash,
                },
            )
            .await?;

        BusinessEvent::UserRegistered {
            user_id: user.id,
            email_redacted: redact_email(&user.email),
        }
        .log();

        let token = credentials.issue(user.id)?;
        Ok(LoginResponse {
            token,
            user: UserResponse::from(user),
        })
    }

    pub async fn login(
        db: &Database,
        credentials: &CredentialService,
        req: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        let Some(user) = user_repo::find_by_email(db.pool(), req.email.trim()).await? else {
            BusinessEvent::LoginFailed {
                email_redacted: redact_email(&req.email),
                reason: "user_not_found".to_string(),
            }
            .log();
            return Err(AppError::InvalidCredentials(
                "Invalid email or password".to_string(),
            ));
        };

        if !credentials.verify_password(&req.password, &user.password_hash) {
            BusinessEvent::LoginFailed {
                email_redacted: redact_email(&req.email),
                reason: "invalid_password".to_string(),
            }
            .log();
            return Err(AppError::InvalidCredentials(
                "Invalid email or password".to_string(),
            ));
        }

        let token = credentials.issue(user.id)?;
        BusinessEvent::UserLoggedIn { user_id: user.id }.log();
        Ok(LoginResponse {
            token,
            user: UserResponse::from(user),
        })
    }

    pub async fn get_user_by_id(db: &Database, user_id: i64) -> Result<UserResponse, AppError> {
        let user = USERS
            .get(db.pool(), user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(UserResponse::from(user))
    }

    /// Deletes the account with everything it owns, then removes the
    /// uploaded files of its pages.
    pub async fn delete_account(
        coordinator: &OwnershipCoordinator,
        blobs: &BlobStore,
        user_id: i64,
    ) -> Result<DeleteAccountResponse, AppError> {
        let deletion = coordinator.delete_user(user_id).await?;
        blobs.delete_all(&deletion.files).await;
        Ok(DeleteAccountResponse {
            qrs_deleted: deletion.qrs_deleted,
            pages_deleted: deletion.pages_deleted,
        })
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    domain.contains('.')
}
