//! End-to-end access checks for the admin area.
//!
//! The scenario the guard exists for: a client-role account reaches an
//! admin route, the guard answers `Unauthorized`, and the view redirects
//! to login. Promotion takes effect on the next navigation because the
//! guard re-reads the profile every time.

use vitrine_admin::UserDirectory;
use vitrine_core::Role;
use vitrine_integration_tests::TestContext;
use vitrine_storefront::{AccessState, SessionGuard};

#[tokio::test]
async fn test_visitor_without_session_is_unauthorized() {
    let ctx = TestContext::new();
    let guard = SessionGuard::new(ctx.handle());

    assert_eq!(guard.check().await, AccessState::Unauthorized);
}

#[tokio::test]
async fn test_client_is_turned_away_from_admin_area() {
    let ctx = TestContext::new();
    ctx.sign_up_as("shopper@example.com", Role::Client).await;

    let guard = SessionGuard::new(ctx.handle());
    assert_eq!(guard.check().await, AccessState::Unauthorized);
}

#[tokio::test]
async fn test_default_allowed_set_admits_both_staff_roles() {
    let ctx = TestContext::new();
    let guard = SessionGuard::new(ctx.handle());

    ctx.sign_up_as("mod@example.com", Role::Moderator).await;
    assert_eq!(guard.check().await, AccessState::Authorized);

    ctx.sign_up_as("root@example.com", Role::Admin).await;
    assert_eq!(guard.check().await, AccessState::Authorized);
}

#[tokio::test]
async fn test_promotion_applies_on_next_navigation() {
    let ctx = TestContext::new();
    let shopper = ctx.sign_up_as("shopper@example.com", Role::Client).await;

    let guard = SessionGuard::new(ctx.handle());
    assert_eq!(guard.check().await, AccessState::Unauthorized);

    // An administrator promotes the shopper from another session.
    ctx.sign_up_as("root@example.com", Role::Admin).await;
    let directory = UserDirectory::new(ctx.handle());
    directory
        .assign_role(shopper, Role::Moderator)
        .await
        .expect("promote shopper");

    // Back as the shopper, the same guard now admits them.
    ctx.sign_in("shopper@example.com").await;
    assert_eq!(guard.check().await, AccessState::Authorized);
}
