use baaskit_core::testing::MockTransport;
use baaskit_core::{
    CredentialStore, FailureReason, MemoryCredentialStore, Method, RequestBody, RequestFactory,
    Response, Session, TransportError,
};
use baaskit_dispatch::{Dispatcher, DispatcherConfig, Priority, RetryPolicy};
use baaskit_user::tasks::{CANNOT_FOLLOW_YOURSELF, NOT_CURRENT_USER};
use baaskit_user::{Accounts, Filter, Scope, User, UserList};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::oneshot;

struct Harness {
    accounts: Accounts,
    transport: Arc<MockTransport>,
    store: Arc<MemoryCredentialStore>,
}

fn harness(workers: usize, session: Session) -> Harness {
    let transport = Arc::new(MockTransport::new());
    let store = Arc::new(MemoryCredentialStore::with_session(session));
    let factory = RequestFactory::new("http://localhost:9000", "1234567890").unwrap();
    let dispatcher = Dispatcher::start(
        DispatcherConfig::with_workers(workers),
        transport.clone(),
        store.clone(),
        factory,
    )
    .unwrap();
    Harness { accounts: Accounts::new(Arc::new(dispatcher)), transport, store }
}

fn alice() -> Session {
    Session::authenticated("alice", "pw", "tok-1").unwrap()
}

fn user_data(name: &str) -> serde_json::Value {
    json!({
        "user": {"name": name, "status": "ACTIVE", "roles": [{"name": "registered"}]},
        "signUpDate": "2014-01-20T10:00:00.000+0100",
        "visibleByTheUser": {},
        "visibleByFriends": {},
        "visibleByRegisteredUsers": {},
        "visibleByAnonymousUsers": {}
    })
}

#[tokio::test]
async fn test_login_outranks_lower_priority_list_fetch() {
    let h = harness(1, Session::empty());
    let gate = h.transport.hold(
        Method::GET,
        "user/carol/password/reset",
        Response::json(200, &json!({"result": "ok"})),
    );
    h.transport.on(
        Method::POST,
        "login",
        Response::json(200, &json!({"result": "ok", "data": {"X-BB-SESSION": "tok-1"}})),
    );
    h.transport.on(
        Method::GET,
        "users",
        Response::json(200, &json!({"result": "ok", "data": [user_data("bob")]})),
    );

    let (reset_tx, reset_rx) = oneshot::channel();
    h.accounts
        .reset_password_async("carol", Priority::DEFAULT, move |e| {
            let _ = reset_tx.send(e);
        })
        .unwrap();
    h.transport.wait_for_calls(1).await;

    let (list_tx, list_rx) = oneshot::channel();
    h.accounts
        .fetch_users_async(UserList::All, Filter::default(), Priority(1), move |e| {
            let _ = list_tx.send(e);
        })
        .unwrap();
    let (login_tx, login_rx) = oneshot::channel();
    h.accounts
        .login_async("alice", "pw", Priority(5), move |e| {
            let _ = login_tx.send(e);
        })
        .unwrap();

    gate.open();
    assert_eq!(reset_rx.await.unwrap(), Ok(()));
    let user = login_rx.await.unwrap().unwrap();
    let users = list_rx.await.unwrap().unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(users.len(), 1);
    assert_eq!(h.transport.paths(), vec!["/user/carol/password/reset", "/login", "/users"]);
    assert_eq!(h.store.get(), alice());
    // the list fetch ran after the login, so it carried the new token
    assert_eq!(h.transport.calls()[2].header("X-BB-SESSION"), Some("tok-1"));
}

#[tokio::test]
async fn test_saving_another_user_is_skipped() {
    let h = harness(2, alice());
    let mut bob = User::new("bob");
    bob.scope_mut(Scope::Public).insert("nick".into(), json!("bobby"));

    let envelope = h.accounts.save(bob, Priority::DEFAULT).await.unwrap();

    assert_eq!(envelope, Err(FailureReason::skipped(NOT_CURRENT_USER)));
    assert_eq!(h.transport.call_count(), 0);
    assert_eq!(h.store.get(), alice());
}

#[tokio::test]
async fn test_save_current_user_sends_scopes() {
    let h = harness(1, alice());
    let mut data = user_data("alice");
    data["visibleByAnonymousUsers"] = json!({"nick": "ali"});
    h.transport.on(Method::PUT, "me", Response::json(200, &json!({"data": data})));

    let mut profile = User::new("alice");
    profile.scope_mut(Scope::Public).insert("nick".into(), json!("ali"));
    let saved = h.accounts.save(profile, Priority::DEFAULT).await.unwrap().unwrap();

    assert_eq!(saved.scope(Scope::Public).unwrap()["nick"], "ali");
    let call = &h.transport.calls()[0];
    assert_eq!(
        call.body,
        Some(RequestBody::Json(json!({"visibleByAnonymousUsers": {"nick": "ali"}})))
    );
    assert_eq!(h.store.get(), alice());
}

#[tokio::test]
async fn test_logout_clears_session_and_late_cancel_is_refused() {
    let h = harness(1, alice());
    h.transport.on(Method::POST, "logout", Response::json(200, &json!({"result": "ok"})));

    let (tx, rx) = oneshot::channel();
    let handle = h
        .accounts
        .logout_async("alice", Priority::DEFAULT, move |e| {
            let _ = tx.send(e);
        })
        .unwrap();

    assert_eq!(rx.await.unwrap(), Ok(()));
    assert!(!h.store.get().is_authenticated());
    assert!(!handle.cancel());
    assert!(h.accounts.current_user().is_none());
}

#[tokio::test]
async fn test_rejected_logout_still_clears_session() {
    let h = harness(1, alice());
    h.transport.on(
        Method::POST,
        "logout",
        Response::json(400, &json!({"result": "error", "message": "bad request"})),
    );

    let envelope = h.accounts.logout("alice", Priority::DEFAULT).await.unwrap();

    assert_eq!(
        envelope,
        Err(FailureReason::ClientError { status: 400, reason: Some("bad request".into()) })
    );
    assert!(!h.store.get().is_authenticated());
}

#[tokio::test]
async fn test_signup_then_change_password() {
    let h = harness(2, Session::empty());
    let mut signup_data = user_data("dave");
    signup_data["X-BB-SESSION"] = json!("tok-d");
    h.transport.on(Method::POST, "user", Response::json(201, &json!({"data": signup_data})));
    h.transport.on(Method::PUT, "me/password", Response::json(200, &json!({"result": "ok"})));

    let user = h
        .accounts
        .signup(User::new("dave").with_password("pw"), Priority::DEFAULT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.token.as_deref(), Some("tok-d"));
    assert!(user.has_role("registered"));
    assert_eq!(h.store.get(), Session::authenticated("dave", "pw", "tok-d").unwrap());

    h.accounts.change_password("dave", "pw2", Priority::DEFAULT).await.unwrap().unwrap();
    assert_eq!(h.store.get(), Session::authenticated("dave", "pw2", "tok-d").unwrap());

    let change = &h.transport.calls()[1];
    assert_eq!(change.header("X-BB-SESSION"), Some("tok-d"));
    assert_eq!(change.body, Some(RequestBody::Json(json!({"old": "pw", "new": "pw2"}))));
}

#[tokio::test]
async fn test_follow_and_self_follow() {
    let h = harness(1, alice());
    h.transport.on(Method::POST, "follow/bob", Response::json(200, &json!({"data": user_data("bob")})));
    h.transport.on(Method::DELETE, "follow/bob", Response::json(200, &json!({"result": "ok"})));

    let followed = h.accounts.follow("bob", Priority::DEFAULT).await.unwrap().unwrap();
    assert_eq!(followed.username, "bob");
    assert_eq!(h.accounts.unfollow("bob", Priority::DEFAULT).await.unwrap(), Ok(()));

    let own = h.accounts.follow("alice", Priority::DEFAULT).await.unwrap();
    assert_eq!(own, Err(FailureReason::skipped(CANNOT_FOLLOW_YOURSELF)));
    assert_eq!(h.transport.call_count(), 2);
}

#[tokio::test]
async fn test_fetch_user_and_followers_with_filter() {
    let h = harness(2, alice());
    h.transport.on(Method::GET, "me", Response::json(200, &json!({"data": user_data("alice")})));
    h.transport.on(
        Method::GET,
        "followers/bob",
        Response::json(200, &json!({"data": [user_data("carol"), user_data("dave")]})),
    );
    h.transport.on(
        Method::GET,
        "user/ghost",
        Response::json(404, &json!({"result": "error", "message": "user not found"})),
    );

    let me = h.accounts.fetch("alice", Priority::DEFAULT).await.unwrap().unwrap();
    assert_eq!(me.status.as_deref(), Some("ACTIVE"));

    let filter = Filter::new().order_by("user.name").page(0, 2);
    let followers = h
        .accounts
        .fetch_users(UserList::Followers(Some("bob".into())), filter, Priority::DEFAULT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(followers.len(), 2);
    let list_call = h.transport.calls().into_iter().find(|c| c.path() == "/followers/bob").unwrap();
    assert!(list_call.url.ends_with("?orderBy=user.name&page=0&recordsPerPage=2"));

    let missing = h.accounts.fetch("ghost", Priority::DEFAULT).await.unwrap();
    assert_eq!(
        missing,
        Err(FailureReason::ClientError { status: 404, reason: Some("user not found".into()) })
    );
    assert_eq!(h.store.get(), alice());
}

#[tokio::test]
async fn test_expired_token_clears_session() {
    let h = harness(1, alice());
    h.transport.on(
        Method::GET,
        "social",
        Response::json(401, &json!({"message": "Authentication info not valid or not provided"})),
    );

    let envelope = h.accounts.linked_providers("alice", Priority::DEFAULT).await.unwrap();

    assert!(envelope.unwrap_err().is_unauthenticated());
    assert!(!h.store.get().is_authenticated());
}

#[tokio::test]
async fn test_social_signup_and_provider_links() {
    let h = harness(1, Session::empty());
    let mut data = user_data("fb_123");
    data["X-BB-SESSION"] = json!("tok-s");
    h.transport.on(Method::POST, "social/facebook", Response::json(200, &json!({"data": data})));
    h.transport.on(Method::PUT, "social/google", Response::json(200, &json!({"result": "ok"})));
    h.transport.on(Method::DELETE, "social/google", Response::json(200, &json!({"result": "ok"})));

    let user = h
        .accounts
        .social_signup("facebook", "oauth-t", "oauth-s", Priority::DEFAULT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.social.as_deref(), Some("facebook"));
    assert_eq!(h.accounts.current_user().as_deref(), Some("fb_123"));

    let linked = h
        .accounts
        .link_provider("fb_123", "google", "g-t", "g-s", Priority::DEFAULT)
        .await
        .unwrap();
    assert_eq!(linked, Ok(()));
    let unlinked = h.accounts.unlink_provider("fb_123", "google", Priority::DEFAULT).await.unwrap();
    assert_eq!(unlinked, Ok(()));

    let not_mine = h.accounts.unlink_provider("alice", "google", Priority::DEFAULT).await.unwrap();
    assert_eq!(not_mine, Err(FailureReason::skipped(NOT_CURRENT_USER)));
}

#[tokio::test]
async fn test_retry_policy_applies_to_awaited_calls() {
    let h = harness(1, Session::empty());
    let accounts = h.accounts.clone().with_retry(RetryPolicy {
        max_retries: 2,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
        jitter: false,
    });
    h.transport.fail(Method::GET, "user/erin/password/reset", TransportError::Connect("refused".into()));

    let envelope = accounts.reset_password("erin", Priority::DEFAULT).await.unwrap();

    assert!(matches!(envelope, Err(FailureReason::Transport(TransportError::Connect(_)))));
    assert_eq!(h.transport.call_count(), 3);
}
