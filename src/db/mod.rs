pub mod db;
pub mod notificationdb;
pub mod paymentdb;
pub mod proposaldb;
pub mod servicedb;
pub mod userdb;
#[cfg(test)]
pub mod testing;
