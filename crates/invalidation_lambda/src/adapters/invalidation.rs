use invalidation_core::contract::{InvalidationReceipt, InvalidationRequest};

pub trait InvalidationService {
    fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<InvalidationReceipt, String>;
}
