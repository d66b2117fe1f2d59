use stockroom_core::ShopId;

/// Shop context for a request.
///
/// This is immutable and must be present for all domain routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShopContext {
    shop_id: ShopId,
}

impl ShopContext {
    pub fn new(shop_id: ShopId) -> Self {
        Self { shop_id }
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }
}
