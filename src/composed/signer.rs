use derive_builder::Builder;
use log::{debug, info};
use smallvec::smallvec;
use snafu::ResultExt;

use crate::adapter::{Session, SigningCapability};
use crate::armor::{armor_with_version, BlockType, DEFAULT_VERSION};
use crate::composed::{ExistingKey, KeyLoader};
use crate::crypto::ecc_curve::ECCCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::errors::{AuthoritySnafu, Error, IntegritySnafu, KeyMismatch, Result};
use crate::packet::{
    KeyFlags, PacketTrait, PublicKey, Signature, SignatureConfig, SignatureType, Subpacket,
    SubpacketData, UserId, KEYSERVER_NO_MODIFY,
};
use crate::types::{CompressionAlgorithm, Timestamp};

/// Knobs for the packets a [`Signer`] produces.
///
/// The defaults produce the same bytes GnuPG compatible tooling expects from a
/// hardware-backed key.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(error = "Error"))]
pub struct SignerOptions {
    /// `Version` header of armored output.
    #[builder(default = "DEFAULT_VERSION.to_string()", setter(into))]
    pub armor_version: String,
    #[builder(default = "HashAlgorithm::Sha256")]
    pub preferred_hash: HashAlgorithm,
    #[builder(default = "CompressionAlgorithm::Uncompressed")]
    pub preferred_compression: CompressionAlgorithm,
    #[builder(default = "KEYSERVER_NO_MODIFY")]
    pub keyserver_prefs: u8,
}

impl Default for SignerOptions {
    fn default() -> Self {
        SignerOptions {
            armor_version: DEFAULT_VERSION.to_string(),
            preferred_hash: HashAlgorithm::Sha256,
            preferred_compression: CompressionAlgorithm::Uncompressed,
            keyserver_prefs: KEYSERVER_NO_MODIFY,
        }
    }
}

/// Produces exported keys, subkey bindings and message signatures for the key held by one
/// signing capability.
///
/// The capability is released when the signer is closed or dropped.
#[derive(derive_more::Debug)]
#[debug("Signer({user_id:?}, {pubkey:?})")]
pub struct Signer<S: SigningCapability> {
    user_id: String,
    pubkey: PublicKey,
    session: Session<S>,
    options: SignerOptions,
}

impl<S: SigningCapability> Signer<S> {
    /// Fetches the verifying key from `capability` and builds the public key around it.
    pub fn new(user_id: &str, created: Timestamp, curve: ECCCurve, capability: S) -> Result<Self> {
        Self::with_options(user_id, created, curve, capability, SignerOptions::default())
    }

    pub fn with_options(
        user_id: &str,
        created: Timestamp,
        curve: ECCCurve,
        capability: S,
        options: SignerOptions,
    ) -> Result<Self> {
        Self::from_session(user_id, created, curve, Session::new(capability), options)
    }

    /// Rebuilds the signer of a key that is already on the keyring.
    ///
    /// Fails with [`Error::Integrity`] if the record is inconsistent or the capability holds
    /// a different key. The capability is released on failure.
    pub fn from_existing_key(user_id: &str, existing: &ExistingKey, capability: S) -> Result<Self> {
        Self::from_existing_session(user_id, existing, Session::new(capability))
    }

    /// Like [`Signer::from_existing_key`], looking the key up through `loader`.
    pub fn from_keyring<L: KeyLoader + ?Sized>(
        loader: &mut L,
        user_id: &str,
        capability: S,
    ) -> Result<Self> {
        let session = Session::new(capability);
        let existing = loader.load(user_id)?;
        Self::from_existing_session(user_id, &existing, session)
    }

    fn from_session(
        user_id: &str,
        created: Timestamp,
        curve: ECCCurve,
        mut session: Session<S>,
        options: SignerOptions,
    ) -> Result<Self> {
        let key = session.verifying_key().context(AuthoritySnafu)?;
        let pubkey = PublicKey::new(curve, created, key)?;

        info!("{} GPG public key {} created at {}", curve, pubkey, created);

        Ok(Signer {
            user_id: user_id.to_string(),
            pubkey,
            session,
            options,
        })
    }

    fn from_existing_session(
        user_id: &str,
        existing: &ExistingKey,
        session: Session<S>,
    ) -> Result<Self> {
        existing.verify()?;
        let curve = ECCCurve::from_algorithm(existing.algo)?;
        let signer = Self::from_session(
            user_id,
            existing.created,
            curve,
            session,
            SignerOptions::default(),
        )?;

        let actual = signer.pubkey.key_id();
        if actual != existing.key_id {
            return IntegritySnafu {
                expected: existing.key_id,
                mismatch: KeyMismatch::KeyId { actual },
            }
            .fail();
        }
        Ok(signer)
    }

    pub fn pubkey(&self) -> &PublicKey {
        &self.pubkey
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn options(&self) -> &SignerOptions {
        &self.options
    }

    /// Exports the self-certified public key: public key, user id and signature packets.
    pub fn export(&mut self) -> Result<Vec<u8>> {
        let user_id = UserId::from_str(&self.user_id);

        let mut data_to_sign = self.pubkey.data_to_hash()?;
        data_to_sign.extend_from_slice(&user_id.certification_data()?);
        info!("signing public key {:?}", self.user_id);

        let config = SignatureConfig::new_v4(
            SignatureType::CertPositive,
            self.pubkey.algorithm(),
            HashAlgorithm::Sha256,
            vec![
                Subpacket::regular(SubpacketData::SignatureCreationTime(self.pubkey.created()))?,
                Subpacket::regular(SubpacketData::KeyFlags(
                    KeyFlags::certify_and_sign().into(),
                ))?,
                Subpacket::regular(SubpacketData::PreferredHashAlgorithms(smallvec![
                    self.options.preferred_hash
                ]))?,
                Subpacket::regular(SubpacketData::PreferredCompressionAlgorithms(smallvec![
                    self.options.preferred_compression
                ]))?,
                Subpacket::regular(SubpacketData::KeyServerPreferences(smallvec![
                    self.options.keyserver_prefs
                ]))?,
            ],
            vec![Subpacket::regular(SubpacketData::Issuer(self.pubkey.key_id()))?],
        );
        let signature = config.sign(&mut self.session, &data_to_sign)?;

        let mut out = self.pubkey.to_packet()?;
        out.extend_from_slice(&user_id.to_packet()?);
        out.extend_from_slice(&signature.to_packet()?);
        Ok(out)
    }

    pub fn export_armored(&mut self) -> Result<String> {
        let blob = self.export()?;
        armor_with_version(&blob, BlockType::PublicKey, &self.options.armor_version)
    }

    /// Binds this key as a signing subkey of `primary`.
    ///
    /// This signer's capability signs the embedded primary key binding signature, the
    /// capability holding the primary key signs the outer subkey binding signature. The
    /// primary capability is released before returning, the packets are
    /// `public subkey ‖ signature`.
    pub fn subkey<P: SigningCapability>(
        &mut self,
        primary: &ExistingKey,
        primary_signer: P,
    ) -> Result<Vec<u8>> {
        let mut primary_session = Session::new(primary_signer);
        primary.verify()?;

        info!("adding as subkey to {} ({})", self.user_id, primary.key_id);

        let subkey_packet = self.pubkey.as_subkey().to_packet()?;
        let data_to_sign = self.binding_data(primary)?;

        let embedded = self.primary_key_binding(&data_to_sign)?;
        debug!("embedded signature: {:?}", embedded);

        let config = SignatureConfig::new_v4(
            SignatureType::SubkeyBinding,
            primary.algo,
            HashAlgorithm::Sha256,
            vec![
                Subpacket::regular(SubpacketData::SignatureCreationTime(self.pubkey.created()))?,
                Subpacket::regular(SubpacketData::KeyFlags(KeyFlags::sign_only().into()))?,
            ],
            vec![
                Subpacket::regular(SubpacketData::Issuer(primary.key_id))?,
                Subpacket::regular(SubpacketData::EmbeddedSignature(Box::new(embedded)))?,
            ],
        );
        let signature = config.sign(&mut primary_session, &data_to_sign)?;
        primary_session.close().context(AuthoritySnafu)?;

        let mut out = subkey_packet;
        out.extend_from_slice(&signature.to_packet()?);
        Ok(out)
    }

    /// `primary hashable ‖ subkey hashable`, covered by both binding signatures.
    fn binding_data(&self, primary: &ExistingKey) -> Result<Vec<u8>> {
        let mut data = primary.hashable.clone();
        data.extend_from_slice(&self.pubkey.data_to_hash()?);
        Ok(data)
    }

    fn primary_key_binding(&mut self, data_to_sign: &[u8]) -> Result<Signature> {
        let config = SignatureConfig::new_v4(
            SignatureType::KeyBinding,
            self.pubkey.algorithm(),
            HashAlgorithm::Sha256,
            vec![Subpacket::regular(SubpacketData::SignatureCreationTime(
                self.pubkey.created(),
            ))?],
            vec![Subpacket::regular(SubpacketData::Issuer(self.pubkey.key_id()))?],
        );
        config.sign(&mut self.session, data_to_sign)
    }

    /// Creates a detached binary signature over `msg`, made at `sign_time`.
    pub fn sign(&mut self, msg: &[u8], sign_time: Timestamp) -> Result<Vec<u8>> {
        info!("signing {} byte message at {}", msg.len(), sign_time);

        let config = SignatureConfig::new_v4(
            SignatureType::Binary,
            self.pubkey.algorithm(),
            HashAlgorithm::Sha256,
            vec![Subpacket::regular(SubpacketData::SignatureCreationTime(
                sign_time,
            ))?],
            vec![Subpacket::regular(SubpacketData::Issuer(self.pubkey.key_id()))?],
        );
        let signature = config.sign(&mut self.session, msg)?;
        signature.to_packet()
    }

    pub fn sign_armored(&mut self, msg: &[u8], sign_time: Timestamp) -> Result<String> {
        let blob = self.sign(msg, sign_time)?;
        armor_with_version(&blob, BlockType::Signature, &self.options.armor_version)
    }

    /// Releases the signing capability.
    pub fn close(mut self) -> Result<()> {
        self.session.close().context(AuthoritySnafu)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use hex_literal::hex;

    use super::*;
    use crate::adapter::AuthorityError;
    use crate::packet::parse_mpis;
    use crate::ser::Serialize;
    use crate::types::{KeyId, Mpi, VerifyingKey};

    type Digests = Rc<RefCell<Vec<Vec<u8>>>>;

    /// Answers every digest with the same two MPIs and records what it saw.
    struct Stub {
        key: VerifyingKey,
        digests: Digests,
        released: Rc<RefCell<usize>>,
    }

    impl Stub {
        fn new(seed: u8) -> Self {
            Stub {
                key: ed25519_dalek::SigningKey::from_bytes(&[seed; 32])
                    .verifying_key()
                    .into(),
                digests: Default::default(),
                released: Default::default(),
            }
        }
    }

    impl SigningCapability for Stub {
        fn verifying_key(&mut self) -> Result<VerifyingKey, AuthorityError> {
            Ok(self.key.clone())
        }

        fn sign(&mut self, digest: &[u8]) -> Result<Vec<u8>, AuthorityError> {
            self.digests.borrow_mut().push(digest.to_vec());
            Ok(vec![Mpi::from_slice(&[1]), Mpi::from_slice(&[2])]
                .to_bytes()
                .unwrap())
        }

        fn release(&mut self) -> Result<(), AuthorityError> {
            *self.released.borrow_mut() += 1;
            Ok(())
        }
    }

    const CREATED: Timestamp = Timestamp::from_secs(1_600_000_000);

    fn signer() -> (Signer<Stub>, Digests) {
        let stub = Stub::new(1);
        let digests = stub.digests.clone();
        let signer = Signer::new("Alice", CREATED, ECCCurve::Ed25519, stub).unwrap();
        (signer, digests)
    }

    fn existing_for(key: &PublicKey) -> ExistingKey {
        ExistingKey {
            created: key.created(),
            algo: key.algorithm(),
            key_id: key.key_id(),
            hashable: key.data_to_hash().unwrap(),
        }
    }

    #[test]
    fn test_options_defaults() {
        let built = SignerOptionsBuilder::default().build().unwrap();
        assert_eq!(built, SignerOptions::default());
        assert_eq!(built.armor_version, "GnuPG v2");
        assert_eq!(built.keyserver_prefs, 0x80);

        let custom = SignerOptionsBuilder::default()
            .armor_version("test")
            .build()
            .unwrap();
        assert_eq!(custom.armor_version, "test");
    }

    #[test]
    fn test_export_packet_sequence() {
        let (mut signer, digests) = signer();
        let out = signer.export().unwrap();
        assert_eq!(digests.borrow().len(), 1);

        let key_packet = signer.pubkey().to_packet().unwrap();
        let uid_packet = UserId::from_str("Alice").to_packet().unwrap();
        assert_eq!(&out[..key_packet.len()], &key_packet[..]);
        assert_eq!(
            &out[key_packet.len()..key_packet.len() + uid_packet.len()],
            &uid_packet[..]
        );

        let sig = &out[key_packet.len() + uid_packet.len()..];
        assert_eq!(sig[0], 0x88);
        assert_eq!(usize::from(sig[1]), sig.len() - 2);
        // version, positive certification, EdDSA, SHA256
        assert_eq!(&sig[2..6], &hex!("04 13 16 08"));
        // time, key flags, hash pref, compression pref, keyserver prefs, then the issuer
        assert_eq!(
            &sig[6..30],
            &hex!("0012 0502 5f5e1000 021b03 021508 021600 021780 000a 0910")
        );
        assert_eq!(&sig[30..38], signer.pubkey().key_id().as_ref());
    }

    #[test]
    fn test_export_armored() {
        let (mut signer, _) = signer();
        let armored = signer.export_armored().unwrap();
        assert!(armored.starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----\nVersion: GnuPG v2\n\n"));
        assert!(armored.ends_with("-----END PGP PUBLIC KEY BLOCK-----\n"));
    }

    #[test]
    fn test_sign_message() {
        let (mut signer, digests) = signer();
        let out = signer
            .sign(b"hello", Timestamp::from_secs(1_700_000_000))
            .unwrap();

        assert_eq!(out[0], 0x88);
        assert_eq!(usize::from(out[1]), out.len() - 2);
        assert_eq!(&out[2..6], &hex!("04 00 16 08"));
        assert_eq!(&out[6..14], &hex!("0006 0502 6553f100"));

        let digests = digests.borrow();
        assert_eq!(digests.len(), 1);
        assert_eq!(&out[out.len() - 8..out.len() - 6], &digests[0][..2]);
        assert_eq!(
            parse_mpis(&out[out.len() - 6..]).unwrap(),
            vec![Mpi::from_slice(&[1]), Mpi::from_slice(&[2])]
        );
    }

    #[test]
    fn test_subkey_uses_both_capabilities() {
        let primary_key = PublicKey::new(
            ECCCurve::Ed25519,
            Timestamp::from_secs(1_500_000_000),
            Stub::new(9).key,
        )
        .unwrap();
        let existing = existing_for(&primary_key);

        let (mut signer, digests) = signer();
        let primary = Stub::new(9);
        let primary_digests = primary.digests.clone();
        let primary_released = primary.released.clone();

        let out = signer.subkey(&existing, primary).unwrap();
        assert_eq!(out[0], 0xB8);
        assert_eq!(digests.borrow().len(), 1);
        assert_eq!(primary_digests.borrow().len(), 1);
        assert_eq!(*primary_released.borrow(), 1);

        let sub_len = signer.pubkey().as_subkey().to_packet().unwrap().len();
        let sig = &out[sub_len..];
        assert_eq!(sig[0], 0x88);
        // subkey binding made with the primary's algorithm
        assert_eq!(&sig[2..5], &hex!("04 18 16"));
        assert!(sig.windows(8).any(|w| w == existing.key_id.as_ref()));
    }

    #[test]
    fn test_subkey_rejects_mismatched_primary() {
        let (mut signer, digests) = signer();
        let mut existing = existing_for(signer.pubkey());
        existing.key_id = KeyId::from([0; 8]);

        let primary = Stub::new(9);
        let primary_digests = primary.digests.clone();
        let primary_released = primary.released.clone();

        assert!(matches!(
            signer.subkey(&existing, primary),
            Err(Error::Integrity { .. })
        ));
        assert!(primary_digests.borrow().is_empty());
        assert!(digests.borrow().is_empty());
        assert_eq!(*primary_released.borrow(), 1);

        existing.key_id = signer.pubkey().key_id();
        assert!(signer.subkey(&existing, Stub::new(9)).is_ok());
    }

    #[test]
    fn test_from_existing_key() {
        let (reference, _) = signer();
        let existing = existing_for(reference.pubkey());

        let same = Signer::from_existing_key("Alice", &existing, Stub::new(1)).unwrap();
        assert_eq!(same.pubkey(), reference.pubkey());

        let stub = Stub::new(2);
        let released = stub.released.clone();
        assert!(matches!(
            Signer::from_existing_key("Alice", &existing, stub),
            Err(Error::Integrity { .. })
        ));
        assert_eq!(*released.borrow(), 1);
    }

    #[test]
    fn test_from_keyring() {
        struct Keyring(ExistingKey);

        impl KeyLoader for Keyring {
            fn load(&mut self, user_id: &str) -> Result<ExistingKey> {
                ensure_eq!(user_id, "Alice");
                Ok(self.0.clone())
            }
        }

        let (reference, _) = signer();
        let mut keyring = Keyring(existing_for(reference.pubkey()));

        let signer = Signer::from_keyring(&mut keyring, "Alice", Stub::new(1)).unwrap();
        assert_eq!(signer.pubkey().key_id(), reference.pubkey().key_id());
        assert!(Signer::from_keyring(&mut keyring, "Bob", Stub::new(1)).is_err());
    }

    #[test]
    fn test_inconsistent_record_releases() {
        let (reference, _) = signer();
        let mut existing = existing_for(reference.pubkey());
        existing.key_id = KeyId::from([0; 8]);

        let stub = Stub::new(1);
        let digests = stub.digests.clone();
        let released = stub.released.clone();
        assert!(matches!(
            Signer::from_existing_key("Alice", &existing, stub),
            Err(Error::Integrity {
                mismatch: KeyMismatch::KeyId { .. },
                ..
            })
        ));
        assert_eq!(*released.borrow(), 1);
        assert!(digests.borrow().is_empty());
    }

    #[test]
    fn test_failed_lookup_releases() {
        struct Empty;

        impl KeyLoader for Empty {
            fn load(&mut self, user_id: &str) -> Result<ExistingKey> {
                bail!("no key for {}", user_id)
            }
        }

        let stub = Stub::new(1);
        let released = stub.released.clone();
        assert!(matches!(
            Signer::from_keyring(&mut Empty, "Alice", stub),
            Err(Error::Message { .. })
        ));
        assert_eq!(*released.borrow(), 1);
    }

    #[test]
    fn test_close_releases_once() {
        let stub = Stub::new(1);
        let released = stub.released.clone();
        let signer = Signer::new("Alice", CREATED, ECCCurve::Ed25519, stub).unwrap();
        signer.close().unwrap();
        assert_eq!(*released.borrow(), 1);
    }

    #[test]
    fn test_curve_mismatch_releases() {
        let stub = Stub::new(1);
        let released = stub.released.clone();
        assert!(Signer::new("Alice", CREATED, ECCCurve::P256, stub).is_err());
        assert_eq!(*released.borrow(), 1);
    }
}
