//! Client-side credential handling.

mod token_store;

pub use token_store::{
  TokenStore, ACCESS_TOKEN_KEY, ADMIN_TOKEN_KEY, LOGGED_IN_KEY,
  REDIRECT_AFTER_LOGIN_KEY, REFRESH_TOKEN_KEY,
};
