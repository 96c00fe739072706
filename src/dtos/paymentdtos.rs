use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::paymentmodel::PaymentMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentDto {
    pub service_id: Uuid,
    pub method: PaymentMethod,
}
