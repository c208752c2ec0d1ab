//! Signing capabilities backed by an external authority.
//!
//! The private half of a key never enters this crate. Whoever holds it, a hardware device or
//! a gpg-agent style process, is wrapped in a [`SigningCapability`]: it reports the verifying
//! key, signs a digest and answers with concatenated MPIs, and can be released.

use log::warn;
use snafu::Snafu;

use crate::types::VerifyingKey;

mod agent;
mod device;

pub use self::agent::{AgentConnection, AgentSigner};
pub use self::device::{DeviceIdentity, DeviceSigner, DeviceTransport};

/// Failures reported by a signing authority.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AuthorityError {
    /// The authority declined, for example because the user cancelled on the device.
    #[snafu(display("refused: {message}"))]
    Refused { message: String },
    #[snafu(display("transport failure: {source}"), context(false))]
    Transport { source: std::io::Error },
    /// The answer does not have the expected shape.
    #[snafu(display("malformed response: {reason}"))]
    Malformed { reason: String },
    #[snafu(display("session already released"))]
    Released,
}

/// An external authority holding one private key.
pub trait SigningCapability {
    /// The public half of the held key.
    fn verifying_key(&mut self) -> Result<VerifyingKey, AuthorityError>;

    /// Signs `digest` and returns the signature value encoded as concatenated MPIs.
    fn sign(&mut self, digest: &[u8]) -> Result<Vec<u8>, AuthorityError>;

    /// Releases the underlying session or connection.
    fn release(&mut self) -> Result<(), AuthorityError>;
}

impl<S: SigningCapability + ?Sized> SigningCapability for Box<S> {
    fn verifying_key(&mut self) -> Result<VerifyingKey, AuthorityError> {
        (**self).verifying_key()
    }

    fn sign(&mut self, digest: &[u8]) -> Result<Vec<u8>, AuthorityError> {
        (**self).sign(digest)
    }

    fn release(&mut self) -> Result<(), AuthorityError> {
        (**self).release()
    }
}

/// Owns a capability and releases it exactly once.
///
/// Release happens through [`Session::close`], or on drop if the session was never closed.
/// Once released, every further request fails with [`AuthorityError::Released`].
#[derive(derive_more::Debug)]
#[debug("Session(released: {released})")]
pub struct Session<S: SigningCapability> {
    inner: S,
    released: bool,
}

impl<S: SigningCapability> Session<S> {
    pub fn new(inner: S) -> Self {
        Session {
            inner,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Releases the capability, reporting any failure.
    pub fn close(&mut self) -> Result<(), AuthorityError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.inner.release()
    }

    fn ensure_open(&self) -> Result<(), AuthorityError> {
        if self.released {
            return ReleasedSnafu.fail();
        }
        Ok(())
    }
}

impl<S: SigningCapability> SigningCapability for Session<S> {
    fn verifying_key(&mut self) -> Result<VerifyingKey, AuthorityError> {
        self.ensure_open()?;
        self.inner.verifying_key()
    }

    fn sign(&mut self, digest: &[u8]) -> Result<Vec<u8>, AuthorityError> {
        self.ensure_open()?;
        self.inner.sign(digest)
    }

    fn release(&mut self) -> Result<(), AuthorityError> {
        self.close()
    }
}

impl<S: SigningCapability> Drop for Session<S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("failed to release signing session: {err}");
        }
    }
}
