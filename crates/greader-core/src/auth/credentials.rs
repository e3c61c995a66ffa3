use keyring::Entry;

/// Keychain service name the reader password is stored under
const SERVICE_NAME: &str = "greader-bridge";

/// OS keychain access for the upstream password, used when the
/// environment does not carry one.
pub struct CredentialStore;

impl CredentialStore {
    /// Store the password for a login identifier in the OS keychain
    pub fn store(username: &str, password: &str) -> keyring::Result<()> {
        Entry::new(SERVICE_NAME, username)?.set_password(password)
    }

    /// Retrieve the password for a login identifier from the OS keychain
    pub fn get_password(username: &str) -> keyring::Result<String> {
        Entry::new(SERVICE_NAME, username)?.get_password()
    }
}
