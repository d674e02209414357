use contactsync_source::{ContactsAccess, Permission, SourceError};

#[test]
fn read_only_grants_read_contacts() {
    let access = ContactsAccess::read_only();
    assert!(access.is_granted(Permission::ReadContacts));
    assert!(access.require(Permission::ReadContacts).is_ok());
}

#[test]
fn none_denies() {
    let access = ContactsAccess::none();
    assert!(!access.is_granted(Permission::ReadContacts));
    match access.require(Permission::ReadContacts) {
        Err(SourceError::PermissionDenied(msg)) => assert!(msg.contains("read-contacts")),
        other => panic!("expected PermissionDenied, got {other:?}"),
    }
}

#[test]
fn grant_and_revoke() {
    let mut access = ContactsAccess::none();
    access.grant(Permission::ReadContacts);
    assert!(access.is_granted(Permission::ReadContacts));
    access.revoke(Permission::ReadContacts);
    assert!(!access.is_granted(Permission::ReadContacts));
}

#[test]
fn serde_uses_kebab_case() {
    let json = serde_json::to_string(&Permission::ReadContacts).unwrap();
    assert_eq!(json, "\"read-contacts\"");
}
