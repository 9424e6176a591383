use blogdesk::identity::inmem::InMemIdentityProvider;
use blogdesk::identity::{user_message, AuthAction, AuthErrorKind, IdentityProvider};

const EMAIL: &str = "reader@example.com";

async fn provider_with_account(ttl: chrono::Duration) -> InMemIdentityProvider {
    let p = InMemIdentityProvider::with_reset_ttl(ttl);
    p.sign_up(EMAIL, "secret1").await.unwrap();
    p.sign_out().await.unwrap();
    p
}

#[tokio::test]
async fn sign_up_then_sign_in_publishes_state() {
    let p = InMemIdentityProvider::new();
    let rx = p.subscribe();
    let created = p.sign_up("New@Example.com", "secret1").await.unwrap();
    assert_eq!(created.email.as_deref(), Some("new@example.com"));
    assert_eq!(rx.borrow().as_ref(), Some(&created));

    p.sign_out().await.unwrap();
    assert!(rx.borrow().is_none());

    let again = p.sign_in("new@example.com", "secret1").await.unwrap();
    assert_eq!(again.uid, created.uid);
}

#[tokio::test]
async fn wrong_password_maps_to_invalid_credential_message() {
    let p = provider_with_account(chrono::Duration::hours(1)).await;
    let err = p.sign_in(EMAIL, "nope-nope").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::InvalidCredential);
    assert_eq!(user_message(AuthAction::SignIn, &err), "Incorrect email address or password.");
    assert!(p.subscribe().borrow().is_none());
}

#[tokio::test]
async fn sign_up_rejections() {
    let p = provider_with_account(chrono::Duration::hours(1)).await;
    let dup = p.sign_up(EMAIL, "another1").await.unwrap_err();
    assert_eq!(dup.kind, AuthErrorKind::EmailAlreadyInUse);
    let weak = p.sign_up("weak@example.com", "123").await.unwrap_err();
    assert_eq!(user_message(AuthAction::SignUp, &weak), "Password must be at least 6 characters.");
}

#[tokio::test]
async fn reset_with_valid_code_changes_password() {
    let p = provider_with_account(chrono::Duration::hours(1)).await;
    p.send_password_reset(EMAIL, Some("http://localhost:5173/")).await.unwrap();
    let sent = p.sent_reset_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].continue_url.as_deref(), Some("http://localhost:5173/"));

    let code = p.latest_reset_code(EMAIL).unwrap();
    p.confirm_password_reset(&code, "changed1").await.unwrap();
    // confirmation never signs the user in
    assert!(p.subscribe().borrow().is_none());
    assert!(p.sign_in(EMAIL, "secret1").await.is_err());
    p.sign_in(EMAIL, "changed1").await.unwrap();

    // codes are single use
    let reused = p.confirm_password_reset(&code, "changed2").await.unwrap_err();
    assert_eq!(reused.kind, AuthErrorKind::InvalidActionCode);
}

#[tokio::test]
async fn expired_code_surfaces_specific_message() {
    let p = provider_with_account(chrono::Duration::seconds(-1)).await;
    p.send_password_reset(EMAIL, None).await.unwrap();
    let code = p.latest_reset_code(EMAIL).unwrap();
    let err = p.confirm_password_reset(&code, "changed1").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::ExpiredActionCode);
    assert_eq!(
        user_message(AuthAction::ConfirmPasswordReset, &err),
        "This reset link has expired. Please request a new reset email."
    );
    assert!(p.sign_in(EMAIL, "changed1").await.is_err());
}

#[tokio::test]
async fn invalid_code_surfaces_specific_message() {
    let p = provider_with_account(chrono::Duration::hours(1)).await;
    let err = p.confirm_password_reset("made-up", "changed1").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::InvalidActionCode);
    assert_eq!(user_message(AuthAction::ConfirmPasswordReset, &err), "This reset link is invalid.");
    assert!(p.subscribe().borrow().is_none());
}

#[tokio::test]
async fn reset_for_unknown_user() {
    let p = InMemIdentityProvider::new();
    let err = p.send_password_reset("ghost@example.com", None).await.unwrap_err();
    assert_eq!(
        user_message(AuthAction::SendPasswordReset, &err),
        "No account is registered for that email address."
    );
}
