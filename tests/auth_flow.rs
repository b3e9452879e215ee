mod common;

use butcher_orders_api::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppError,
    models::Role,
    services::auth_service::{self, verify_token},
};

// Register, reject duplicates and bad roles, log in, and keep failed logins indistinguishable.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn register_and_login_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            username: "  banco  ".into(),
            password: "s3cret".into(),
            role: "counter".into(),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(registered.username, "banco");
    assert_eq!(registered.role, Role::Counter);

    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            username: "banco".into(),
            password: "other".into(),
            role: "prep".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let bad_role = auth_service::register_user(
        &state,
        RegisterRequest {
            username: "boss".into(),
            password: "pw".into(),
            role: "admin".into(),
        },
    )
    .await;
    assert!(matches!(bad_role, Err(AppError::BadRequest(_))));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            username: "banco".into(),
            password: "s3cret".into(),
        },
    )
    .await?
    .data
    .expect("login");
    assert_eq!(login.token_type, "bearer");
    assert_eq!(login.user.id, registered.id);

    let claims = verify_token(&state.keys, &login.access_token)?;
    assert_eq!(claims.user_id, registered.id);
    assert_eq!(claims.username, "banco");
    assert_eq!(claims.role, Role::Counter);

    let wrong_password = auth_service::login_user(
        &state,
        LoginRequest {
            username: "banco".into(),
            password: "nope".into(),
        },
    )
    .await;
    let unknown_user = auth_service::login_user(
        &state,
        LoginRequest {
            username: "ghost".into(),
            password: "s3cret".into(),
        },
    )
    .await;
    match (wrong_password, unknown_user) {
        (Err(AppError::Unauthorized(a)), Err(AppError::Unauthorized(b))) => assert_eq!(a, b),
        other => panic!("expected two Unauthorized errors, got {other:?}"),
    }

    // Simultaneous sign-ups for one name: one wins, every other attempt is a Conflict
    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move {
                auth_service::register_user(
                    &state,
                    RegisterRequest {
                        username: "doppio".into(),
                        password: "pw".into(),
                        role: "prep".into(),
                    },
                )
                .await
            })
        })
        .collect();
    let mut created = 0;
    for attempt in attempts {
        match attempt.await? {
            Ok(_) => created += 1,
            Err(AppError::Conflict(message)) => assert_eq!(message, "Username is already taken"),
            Err(other) => panic!("expected Conflict, got {other:?}"),
        }
    }
    assert_eq!(created, 1);

    Ok(())
}
