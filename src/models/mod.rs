pub mod notificationmodel;
pub mod paymentmodel;
pub mod servicemodel;
pub mod usermodel;
