/// The signing capability a node publishes statements under.
///
/// Nodes never see key material; they only ask the identity for its public
/// id and for signatures over canonical statement bytes.
pub trait PublisherIdentity: Send + Sync {
    /// Stable public identifier for this publisher.
    fn public_id(&self) -> String;

    /// Sign a message, returning the raw signature bytes.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

impl<T: PublisherIdentity + ?Sized> PublisherIdentity for std::sync::Arc<T> {
    fn public_id(&self) -> String {
        (**self).public_id()
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        (**self).sign(message)
    }
}
