pub mod admin;
pub mod entities;
pub mod error;
pub mod first_blood;
pub mod host;
pub mod notify;
pub mod plugin;
pub mod timing;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
