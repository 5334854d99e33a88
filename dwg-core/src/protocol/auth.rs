//! Authentication request body.

use bytes::BytesMut;

use crate::error::DwgError;
use crate::protocol::{BodyReader, WireBody, check_ascii, put_ascii};

/// Width of the user and password fields on the wire.
pub const CREDENTIAL_FIELD_LEN: usize = 16;

/// Longest user or password that still leaves room for a NUL terminator.
pub const MAX_CREDENTIAL_LEN: usize = CREDENTIAL_FIELD_LEN - 1;

/// Credentials the gateway presents right after connecting.
///
/// ```text
/// [0..16)   user      ASCII, NUL-padded
/// [16..32)  password  ASCII, NUL-padded
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    pub user: String,
    pub password: String,
}

impl AuthenticationRequest {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Case-sensitive comparison against the expected credentials.
    pub fn matches(&self, user: &str, password: &str) -> bool {
        self.user == user && self.password == password
    }
}

impl WireBody for AuthenticationRequest {
    const KIND: &'static str = "authentication request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        check_ascii(&self.user, MAX_CREDENTIAL_LEN, "user")?;
        check_ascii(&self.password, MAX_CREDENTIAL_LEN, "password")?;
        put_ascii(dst, &self.user, CREDENTIAL_FIELD_LEN, "user")?;
        put_ascii(dst, &self.password, CREDENTIAL_FIELD_LEN, "password")
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        Ok(Self {
            user: r.ascii(CREDENTIAL_FIELD_LEN, "user")?,
            password: r.ascii(CREDENTIAL_FIELD_LEN, "password")?,
        })
    }
}
