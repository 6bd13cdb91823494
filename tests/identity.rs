mod common;

use common::{windows_host, FakeClient};
use hostadmin::identity::{self, SystemMatch};
use hostadmin::remote::Credentials;
use hostadmin::ErrorKind;

fn client() -> FakeClient {
    FakeClient::new(windows_host("WIN10", "192.168.2.60", &["192.168.1.1"]))
}

#[test]
fn host_name_target_is_confirmed() {
    let result = identity::confirm(&client(), "WIN10", None, &Credentials::ambient()).unwrap();

    assert_eq!(result.system_matches, SystemMatch::Confirmed);
    assert_eq!(result.user_matches, None);
    assert!(result.is_confirmed());
    assert_eq!(
        result.identity.unwrap().logged_on_user.as_deref(),
        Some("CORP\\jdoe")
    );
}

#[test]
fn address_target_is_unverified() {
    let result =
        identity::confirm(&client(), "192.168.2.60", None, &Credentials::ambient()).unwrap();

    assert_eq!(result.system_matches, SystemMatch::Unverified);
    assert!(!result.is_confirmed());
    assert!(result.failure_reason.is_some());
}

#[test]
fn other_host_is_mismatched() {
    let client = FakeClient::new(windows_host("OTHER", "192.168.2.60", &[]));

    let result = identity::confirm(&client, "WIN10", None, &Credentials::ambient()).unwrap();

    assert_eq!(result.system_matches, SystemMatch::Mismatched);
    assert!(result.failure_reason.unwrap().contains("OTHER"));
}

#[test]
fn expected_user_is_checked() {
    let matched =
        identity::confirm(&client(), "WIN10", Some("jdoe"), &Credentials::ambient()).unwrap();
    assert_eq!(matched.user_matches, Some(true));
    assert!(matched.is_confirmed());

    let wrong =
        identity::confirm(&client(), "WIN10", Some("admin"), &Credentials::ambient()).unwrap();
    assert_eq!(wrong.user_matches, Some(false));
    assert!(!wrong.is_confirmed());
}

#[test]
fn remote_failure_is_folded_into_result() {
    let client =
        FakeClient::new(windows_host("WIN10", "192.168.2.60", &[]).failing("identity"));

    let result =
        identity::confirm(&client, "WIN10", Some("jdoe"), &Credentials::ambient()).unwrap();

    assert_eq!(result.system_matches, SystemMatch::Mismatched);
    assert_eq!(result.user_matches, Some(false));
    assert!(result.identity.is_none());
    assert_eq!(result.error.unwrap().kind, ErrorKind::Query);
}

#[test]
fn empty_target_is_rejected() {
    let client = client();

    let err = identity::confirm(&client, " ", None, &Credentials::ambient()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(client.calls().is_empty());
}
