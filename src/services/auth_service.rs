use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User, UserSummary},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Tokens stay valid this long; there is no refresh, callers log in again.
pub const TOKEN_TTL_DAYS: i64 = 7;

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const USERNAME_TAKEN: &str = "Username is already taken";

/// HS256 signing and verification keys derived from the shared secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Sign a token for `user` that expires [`TOKEN_TTL_DAYS`] after `issued_at`.
pub fn issue_token(
    keys: &TokenKeys,
    user: &UserSummary,
    issued_at: DateTime<Utc>,
) -> AppResult<String> {
    let expiration = issued_at
        .checked_add_signed(Duration::days(TOKEN_TTL_DAYS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.as_str().to_string(),
        exp: expiration.timestamp().max(0) as usize,
    };

    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(keys: &TokenKeys, token: &str) -> AppResult<AuthUser> {
    let decoded = decode::<Claims>(token, &keys.decoding, &Validation::default()).map_err(
        |err| match err.kind() {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".into()),
            _ => AppError::Unauthorized("Invalid token".into()),
        },
    )?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;
    let role = decoded
        .claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    Ok(AuthUser {
        user_id,
        username: decoded.claims.username,
        role,
    })
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<UserSummary>> {
    let RegisterRequest {
        username,
        password,
        role,
    } = payload;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::BadRequest("password is required".into()));
    }
    let role = role.parse::<Role>().map_err(AppError::BadRequest)?;

    let exist = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        password_hash: Set(hash_password(&password)?),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, USERNAME_TAKEN))?;
    let user = user_from_entity(user);

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        summary_of(&user),
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user = Users::find()
        .filter(UserCol::Username.eq(username.trim()))
        .one(&state.orm)
        .await?
        .map(user_from_entity);

    // Unknown user and wrong password must be indistinguishable to the caller.
    let user = match user {
        Some(u) if verify_password(&password, &u.password_hash)? => u,
        _ => return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into())),
    };

    let summary = summary_of(&user);
    let token = issue_token(&state.keys, &summary, Utc::now())?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            access_token: token,
            token_type: "bearer".into(),
            user: summary,
        },
        Some(Meta::empty()),
    ))
}

fn summary_of(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        username: user.username.clone(),
        role: user.role,
    }
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        username: model.username,
        password_hash: model.password_hash,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
