// Value types that travel across the bridge. They carry no behavior beyond
// (de)serialization; field names follow the executor's JSON contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session credentials minted by `login` and rotated by the executor.
///
/// Values are opaque to this crate. A rotation always replaces the whole
/// record, so there are no setters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub uid: String,
    pub access_token: String,
    pub refresh_token: String,
    pub salted_key_pass: String,
}

impl Credentials {
    pub fn new(
        uid: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        salted_key_pass: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            salted_key_pass: salted_key_pass.into(),
        }
    }
}

// Tokens end up in debug logs, so only the uid is printed.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("salted_key_pass", &"<redacted>")
            .finish()
    }
}

/// One entry of a share listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Share {
    #[serde(rename = "ShareID")]
    pub share_id: String,
    #[serde(rename = "Name")]
    pub name: String,
}
